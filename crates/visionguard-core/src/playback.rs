//! Mutually-exclusive media focus for one camera view.
//!
//! At most one thing holds the user's media attention: the fullscreen live
//! view or the recorded-clip modal. Activating either implicitly drops the
//! other -- the exclusion is structural (one enum field), not enforced by
//! callbacks.

use tracing::debug;
use url::Url;

use visionguard_api::{ApiClient, DetectionEvent};

use crate::error::CoreError;

// ── ClipHandle ───────────────────────────────────────────────────────

/// An open recorded-clip resource.
///
/// Dropping the handle is the release: the player owning the URL must be
/// torn down when this goes away, so closing the modal can never leak a
/// decoder.
#[derive(Debug)]
pub struct ClipHandle {
    url: Url,
}

impl ClipHandle {
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Drop for ClipHandle {
    fn drop(&mut self) {
        debug!(url = %self.url, "clip released");
    }
}

// ── MediaFocus ───────────────────────────────────────────────────────

/// What currently holds media focus.
#[derive(Debug, Default)]
pub enum MediaFocus {
    #[default]
    None,
    /// Fullscreen on the live multipart stream.
    FullscreenLive,
    /// Modal playing one detection's recorded clip.
    ClipModal(ClipHandle),
}

impl MediaFocus {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

// ── PlaybackController ───────────────────────────────────────────────

/// Tracks and transitions the view's single media focus.
#[derive(Debug)]
pub struct PlaybackController {
    focus: MediaFocus,
    fullscreen_supported: bool,
}

impl PlaybackController {
    /// `fullscreen_supported` is the platform capability probe result.
    pub fn new(fullscreen_supported: bool) -> Self {
        Self {
            focus: MediaFocus::None,
            fullscreen_supported,
        }
    }

    pub fn focus(&self) -> &MediaFocus {
        &self.focus
    }

    /// Put the live view fullscreen, closing any open clip modal.
    ///
    /// Degrades silently to a no-op when the platform lacks the capability:
    /// best-effort, no user-visible error, focus unchanged.
    pub fn request_fullscreen(&mut self) {
        if !self.fullscreen_supported {
            debug!("fullscreen unsupported, ignoring request");
            return;
        }
        self.focus = MediaFocus::FullscreenLive;
    }

    /// Open the clip modal for a detection, leaving fullscreen if active.
    ///
    /// Detections without a recorded clip are a no-op (the thumbnail simply
    /// isn't playable yet); returns whether a clip was opened.
    pub fn open_clip(
        &mut self,
        client: &ApiClient,
        event: &DetectionEvent,
    ) -> Result<bool, CoreError> {
        let Some(video_path) = event.video_path.as_deref() else {
            debug!(event = event.id, "detection has no clip yet");
            return Ok(false);
        };
        let url = client.clip_url(video_path)?;
        self.focus = MediaFocus::ClipModal(ClipHandle { url });
        Ok(true)
    }

    /// Clear the focus; dropping a held [`ClipHandle`] releases the media
    /// resource.
    pub fn close(&mut self) {
        self.focus = MediaFocus::None;
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use visionguard_api::transport::TransportConfig;

    fn client() -> ApiClient {
        let base = Url::parse("http://localhost:5000").expect("static URL");
        ApiClient::new(base, &TransportConfig::default()).expect("client builds")
    }

    fn event_with_clip(id: i64, clip: Option<&str>) -> DetectionEvent {
        DetectionEvent {
            id,
            tracker_id: id,
            object_class: "car".into(),
            start_time: "2024-01-01T00:00:00Z".parse().expect("static timestamp"),
            end_time: None,
            image_path: None,
            video_path: clip.map(str::to_owned),
        }
    }

    #[test]
    fn fullscreen_and_modal_are_mutually_exclusive() {
        let client = client();
        let mut playback = PlaybackController::new(true);

        let opened = playback
            .open_clip(&client, &event_with_clip(1, Some("1.mp4")))
            .expect("clip url builds");
        assert!(opened);
        assert!(matches!(playback.focus(), MediaFocus::ClipModal(_)));

        playback.request_fullscreen();
        assert!(matches!(playback.focus(), MediaFocus::FullscreenLive));

        playback
            .open_clip(&client, &event_with_clip(2, Some("2.mp4")))
            .expect("clip url builds");
        assert!(matches!(playback.focus(), MediaFocus::ClipModal(_)));
    }

    #[test]
    fn fullscreen_degrades_to_noop_when_unsupported() {
        let mut playback = PlaybackController::new(false);
        playback.request_fullscreen();
        assert!(playback.focus().is_none());
    }

    #[test]
    fn clipless_detection_is_a_noop() {
        let client = client();
        let mut playback = PlaybackController::new(true);
        playback.request_fullscreen();

        let opened = playback
            .open_clip(&client, &event_with_clip(1, None))
            .expect("no error for missing clip");
        assert!(!opened);
        // Prior focus untouched -- nothing was activated.
        assert!(matches!(playback.focus(), MediaFocus::FullscreenLive));
    }

    #[test]
    fn close_releases_the_clip() {
        let client = client();
        let mut playback = PlaybackController::new(true);
        playback
            .open_clip(&client, &event_with_clip(1, Some("1.mp4")))
            .expect("clip url builds");

        playback.close();
        assert!(playback.focus().is_none());

        // Idempotent.
        playback.close();
        assert!(playback.focus().is_none());
    }
}
