//! View-layer logic for the VisionGuard camera-monitoring frontend.
//!
//! This crate owns everything between the wire client (`visionguard-api`)
//! and rendering:
//!
//! - **[`CameraView`]** — lifecycle controller for one camera view:
//!   [`open()`](CameraView::open) gates on the session, seeds the snapshot
//!   from the bootstrap fetch, and attaches the live detection stream;
//!   [`switch_camera()`](CameraView::switch_camera) tears the old stream
//!   down completely before the replacement opens.
//!
//! - **[`filter`]** — pure derivation from (snapshot, selected class) to the
//!   displayable event sequence, plus class localization.
//!
//! - **[`PlaybackController`]** — mutually-exclusive media focus
//!   (fullscreen live view vs. recorded-clip modal).
//!
//! - **[`ViewerConfig`]** — transport/backoff configuration feeding the
//!   API client builder.

pub mod config;
pub mod error;
pub mod filter;
pub mod playback;
pub mod view;

pub use config::{TlsVerification, ViewerConfig};
pub use error::CoreError;
pub use filter::{ClassFilter, ObjectClass, class_label};
pub use playback::{ClipHandle, MediaFocus, PlaybackController};
pub use view::{CameraView, ViewOptions};

// Re-export the wire model at the crate root for ergonomics.
pub use visionguard_api::{Camera, DetectionEvent, Session, Snapshot, StreamState};
