// Camera endpoints
//
// Metadata CRUD, the bootstrap detection fetch, and media URL builders.
// Mutating calls go through the CSRF-attaching helpers in `client.rs`;
// required-field validation happens locally and never reaches the network.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::model::{Camera, ClassSetting, Snapshot};

/// Prefix for recorded detection clips.
const CLIP_PREFIX: &str = "/videos/";

/// Prefix for static image assets (detection stills, camera covers).
const IMAGE_PREFIX: &str = "/static/";

// ── Request bodies ───────────────────────────────────────────────────

/// Body for `POST /add_camera`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CameraCreate {
    pub name: String,
    pub url: String,
    pub protocol: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CameraCreate {
    /// Check required fields before submit. Kept local.
    fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation { field: "name" });
        }
        if self.url.trim().is_empty() {
            return Err(Error::Validation { field: "url" });
        }
        if self.protocol.trim().is_empty() {
            return Err(Error::Validation { field: "protocol" });
        }
        Ok(())
    }
}

/// Body for `PUT /update_camera/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CameraUpdate {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub class_settings: Vec<ClassSetting>,
}

impl CameraUpdate {
    fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation { field: "name" });
        }
        Ok(())
    }
}

/// Response from `POST /add_camera`.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraCreated {
    pub camera_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiClient {
    // ── Reads ────────────────────────────────────────────────────────

    /// Fetch one camera's metadata.
    ///
    /// `GET /get_camera/{id}`
    pub async fn get_camera(&self, id: &str) -> Result<Camera, Error> {
        debug!(camera = id, "fetching camera");
        self.get_json(&format!("/get_camera/{id}")).await
    }

    /// List all cameras visible to the current session.
    ///
    /// `GET /cameras`
    pub async fn list_cameras(&self) -> Result<Vec<Camera>, Error> {
        debug!("listing cameras");
        self.get_json("/cameras").await
    }

    /// Fetch the current detection list for a camera.
    ///
    /// `GET /detected_objects/{id}` -- this is the bootstrap snapshot a
    /// view seeds itself with before the SSE stream takes over.
    pub async fn detected_objects(&self, id: &str) -> Result<Snapshot, Error> {
        debug!(camera = id, "fetching detection bootstrap");
        self.get_json(&format!("/detected_objects/{id}")).await
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Register a new camera.
    ///
    /// `POST /add_camera`
    pub async fn add_camera(&self, req: &CameraCreate) -> Result<CameraCreated, Error> {
        req.validate()?;
        debug!(name = %req.name, "adding camera");
        self.post_json("/add_camera", req).await
    }

    /// Update a camera's metadata and per-class settings.
    ///
    /// `PUT /update_camera/{id}`
    pub async fn update_camera(&self, id: &str, req: &CameraUpdate) -> Result<(), Error> {
        req.validate()?;
        debug!(camera = id, "updating camera");
        let _: serde_json::Value = self.put_json(&format!("/update_camera/{id}"), req).await?;
        Ok(())
    }

    /// Remove a camera.
    ///
    /// `DELETE /delete_camera/{id}`
    pub async fn delete_camera(&self, id: &str) -> Result<(), Error> {
        debug!(camera = id, "deleting camera");
        let _: serde_json::Value = self.delete_json(&format!("/delete_camera/{id}")).await?;
        Ok(())
    }

    // ── Media URLs ───────────────────────────────────────────────────

    /// Live view for a camera: a continuous multipart image stream that
    /// stands in for video.
    ///
    /// `GET /video_feed/{id}`
    pub fn video_feed_url(&self, id: &str) -> Result<url::Url, Error> {
        self.url(&format!("/video_feed/{id}"))
    }

    /// Recorded clip for a finalized detection.
    pub fn clip_url(&self, video_path: &str) -> Result<url::Url, Error> {
        self.url(&format!("{CLIP_PREFIX}{}", video_path.trim_start_matches('/')))
    }

    /// Still image under the static asset prefix.
    pub fn image_url(&self, image_path: &str) -> Result<url::Url, Error> {
        self.url(&format!("{IMAGE_PREFIX}{}", image_path.trim_start_matches('/')))
    }
}
