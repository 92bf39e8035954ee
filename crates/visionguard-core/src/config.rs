// Viewer configuration
//
// One value describing how to reach the backend and how aggressively the
// detection stream reconnects. Converted into the api crate's transport
// config when building the client.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;
use visionguard_api::sse::ReconnectConfig;
use visionguard_api::transport::{TlsMode, TransportConfig};
use visionguard_api::{ApiClient, Error};

/// How to verify the backend's TLS certificate.
#[derive(Debug, Clone, Default)]
pub enum TlsVerification {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-hosted dev backends).
    AcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(value: &TlsVerification) -> Self {
        match value {
            TlsVerification::System => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::AcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Connection settings for one backend.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub base_url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout for REST calls. Does not apply to the SSE channel.
    pub timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl ViewerConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Build the API client, creating the process-wide cookie jar.
    pub fn build_client(&self) -> Result<ApiClient, Error> {
        let transport = TransportConfig {
            tls: (&self.tls).into(),
            timeout: self.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar();
        ApiClient::new(self.base_url.clone(), &transport)
    }
}
