// Wire data model for the VisionGuard backend
//
// Fields use `#[serde(default)]` liberally because the backend omits
// optional fields rather than sending nulls in several places.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── DetectionEvent ───────────────────────────────────────────────────

/// One detected object, as stored by the tracker pipeline.
///
/// `id` is unique within a single snapshot. `tracker_id` correlates
/// repeated detections of the same physical object across time and may
/// repeat across events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub id: i64,
    pub tracker_id: i64,
    /// Open-ended class label from the detector (e.g. `"person"`, `"car"`).
    /// Not a closed enumeration -- unknown labels must survive round-trips.
    pub object_class: String,
    pub start_time: DateTime<Utc>,
    /// `None` while the object is still in frame.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Still image captured at first appearance.
    #[serde(default)]
    pub image_path: Option<String>,
    /// Recorded clip of the full track, once finalized.
    #[serde(default)]
    pub video_path: Option<String>,
}

// ── Snapshot ─────────────────────────────────────────────────────────

/// The complete, ordered detection list valid at one instant.
///
/// Replace-semantics: every snapshot received from the backend fully
/// supersedes the previous one. There is no client-side diffing or
/// merging anywhere downstream of this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub events: Vec<DetectionEvent>,
}

impl Snapshot {
    pub fn new(events: Vec<DetectionEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectionEvent> {
        self.events.iter()
    }
}

// ── Camera ───────────────────────────────────────────────────────────

/// Camera metadata from `GET /get_camera/{id}` and `GET /cameras`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Per-class detection settings; present on the single-camera endpoint.
    #[serde(default)]
    pub class_settings: Vec<ClassSetting>,
}

/// Per-class toggles attached to one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSetting {
    pub class_id: i64,
    pub class_name: String,
    #[serde(default)]
    pub is_ignored: bool,
    #[serde(default)]
    pub is_notify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_event_deserializes_with_nulls() {
        let json = r#"{
            "id": 1,
            "tracker_id": 9,
            "object_class": "person",
            "start_time": "2024-01-01T00:00:00Z",
            "image_path": "/img/1.jpg",
            "video_path": null
        }"#;

        let event: DetectionEvent = serde_json::from_str(json).expect("valid payload");
        assert_eq!(event.id, 1);
        assert_eq!(event.tracker_id, 9);
        assert_eq!(event.object_class, "person");
        assert_eq!(event.image_path.as_deref(), Some("/img/1.jpg"));
        assert_eq!(event.video_path, None);
        assert_eq!(event.end_time, None);
    }

    #[test]
    fn snapshot_is_a_transparent_array() {
        let json = r#"[
            {"id": 1, "tracker_id": 9, "object_class": "car", "start_time": "2024-01-01T00:00:00Z"},
            {"id": 2, "tracker_id": 9, "object_class": "car", "start_time": "2024-01-01T00:00:05Z"}
        ]"#;

        let snap: Snapshot = serde_json::from_str(json).expect("valid payload");
        assert_eq!(snap.len(), 2);
        // tracker_id may repeat; id must not (server invariant, not enforced here)
        assert_eq!(snap.events[0].tracker_id, snap.events[1].tracker_id);
    }

    #[test]
    fn camera_tolerates_missing_optionals() {
        let json = r#"{"id": "abc123", "name": "Entrance"}"#;
        let cam: Camera = serde_json::from_str(json).expect("valid payload");
        assert_eq!(cam.id, "abc123");
        assert_eq!(cam.name.as_deref(), Some("Entrance"));
        assert!(cam.tags.is_empty());
        assert!(cam.class_settings.is_empty());
    }
}
