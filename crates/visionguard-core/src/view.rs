//! Camera-view lifecycle controller.
//!
//! One `CameraView` owns everything that must not leak across cameras: the
//! detection stream, its snapshot, and the playback focus. The session is
//! re-resolved on every activation (open and camera switch) because the
//! cookie session and the anti-forgery token can rotate underneath us.
//!
//! Hard invariant: at most one stream connection lives at any instant.
//! `switch_camera` awaits the old stream task's exit *before* bootstrapping
//! the replacement, so an event from camera A can never surface once the
//! subscription to B has started -- the stale watch channel is gone along
//! with the handle that owned it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use visionguard_api::sse::{DetectionStream, ReconnectConfig, StreamHandle, StreamState};
use visionguard_api::{ApiClient, AuthState, Camera, DetectionEvent, Session, SessionGate, Snapshot};

use crate::error::CoreError;
use crate::filter::{self, ClassFilter};
use crate::playback::PlaybackController;

/// Per-view knobs, resolved by the embedding shell.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub reconnect: ReconnectConfig,
    /// Platform capability probe for fullscreen.
    pub fullscreen_supported: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            fullscreen_supported: true,
        }
    }
}

/// Live view of one camera: session, metadata, detection stream, filter,
/// and playback focus. Created at view mount, destroyed at unmount.
#[derive(Debug)]
pub struct CameraView {
    client: ApiClient,
    gate: SessionGate,
    session: Session,
    camera: Camera,
    stream: Option<StreamHandle>,
    selected: ClassFilter,
    playback: PlaybackController,
    options: ViewOptions,
}

impl CameraView {
    /// Mount the view for one camera.
    ///
    /// Gate order is fixed: identity check, anti-forgery priming, camera
    /// metadata, bootstrap detections, then the live stream seeded with the
    /// bootstrap. The view exists only once the bootstrap has resolved;
    /// an anonymous visitor gets [`CoreError::Unauthorized`] and the shell
    /// renders the re-login prompt.
    pub async fn open(
        client: ApiClient,
        camera_id: &str,
        options: ViewOptions,
    ) -> Result<Self, CoreError> {
        let gate = SessionGate::new(client.clone());
        let session = match gate.resolve().await? {
            AuthState::Authenticated(session) => session,
            AuthState::Anonymous => return Err(CoreError::Unauthorized),
        };
        gate.ensure_csrf().await?;

        let camera = client.get_camera(camera_id).await?;
        let bootstrap = client.detected_objects(camera_id).await?;
        info!(camera = camera_id, events = bootstrap.len(), "camera view mounted");

        let stream = DetectionStream::connect(
            client.clone(),
            camera_id,
            bootstrap,
            options.reconnect.clone(),
        );

        Ok(Self {
            client,
            gate,
            session,
            camera,
            stream: Some(stream),
            selected: ClassFilter::All,
            playback: PlaybackController::new(options.fullscreen_supported),
            options,
        })
    }

    /// Point the view at a different camera.
    ///
    /// Teardown-then-open, never overlapped: the previous connection is
    /// fully shut down before the new camera is even fetched. On failure the
    /// view is left stream-less rather than attached to the old camera.
    pub async fn switch_camera(&mut self, camera_id: &str) -> Result<(), CoreError> {
        if let Some(mut old) = self.stream.take() {
            info!(from = old.camera_id(), to = camera_id, "switching camera");
            old.shutdown().await;
        }
        self.playback.close();

        // Re-activation: the session may have rotated or expired.
        self.session = match self.gate.resolve().await? {
            AuthState::Authenticated(session) => session,
            AuthState::Anonymous => return Err(CoreError::Unauthorized),
        };

        self.camera = self.client.get_camera(camera_id).await?;
        let bootstrap = self.client.detected_objects(camera_id).await?;
        self.stream = Some(DetectionStream::connect(
            self.client.clone(),
            camera_id,
            bootstrap,
            self.options.reconnect.clone(),
        ));
        Ok(())
    }

    /// Unmount: tear down the stream and drop the snapshot with it.
    /// Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            info!(camera = stream.camera_id(), "camera view unmounted");
            stream.shutdown().await;
        }
        self.playback.close();
    }

    // ── State access ─────────────────────────────────────────────────

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The current authoritative snapshot (empty after [`close`](Self::close)).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.stream
            .as_ref()
            .map_or_else(Default::default, StreamHandle::snapshot)
    }

    /// Watch receiver over snapshot replacements, for reactive rendering.
    /// `None` once the view is closed.
    pub fn snapshots(&self) -> Option<watch::Receiver<Arc<Snapshot>>> {
        self.stream.as_ref().map(StreamHandle::snapshots)
    }

    /// Current stream connection state ([`StreamState::Closed`] after
    /// teardown).
    pub fn stream_state(&self) -> StreamState {
        self.stream
            .as_ref()
            .map_or(StreamState::Closed, StreamHandle::state)
    }

    // ── Filtering ────────────────────────────────────────────────────

    pub fn selected_filter(&self) -> ClassFilter {
        self.selected
    }

    pub fn set_filter(&mut self, selected: ClassFilter) {
        self.selected = selected;
    }

    /// The displayable event list: `filter(current snapshot, selected class)`.
    pub fn visible_events(&self) -> Vec<DetectionEvent> {
        let snapshot = self.snapshot();
        filter::filter(&snapshot, &self.selected)
            .into_iter()
            .cloned()
            .collect()
    }

    // ── Playback ─────────────────────────────────────────────────────

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackController {
        &mut self.playback
    }

    /// Open the clip modal for a detection thumbnail.
    pub fn open_clip(&mut self, event: &DetectionEvent) -> Result<bool, CoreError> {
        self.playback.open_clip(&self.client, event)
    }

    /// Best-effort fullscreen on the live view.
    pub fn request_fullscreen(&mut self) {
        self.playback.request_fullscreen();
    }
}
