// visionguard-api: Async Rust client for the VisionGuard camera backend (REST + SSE)

pub mod cameras;
pub mod client;
pub mod error;
pub mod model;
pub mod session;
pub mod sse;
pub mod transport;

pub use client::ApiClient;
pub use error::Error;
pub use model::{Camera, ClassSetting, DetectionEvent, Snapshot};
pub use session::{AuthState, Session, SessionGate};
pub use sse::{DetectionStream, ReconnectConfig, StreamHandle, StreamState};
