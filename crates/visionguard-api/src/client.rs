// VisionGuard REST client
//
// Wraps `reqwest::Client` with base-URL handling, cookie-jar access, and
// CSRF header injection. Endpoint modules (session, cameras) are implemented
// as inherent methods via separate files to keep this module focused on
// transport mechanics.
//
// Anti-forgery contract: the backend sets a `csrf_token` cookie; every
// state-changing verb (POST/PUT/DELETE/PATCH) must echo it back as the
// `X-CSRFToken` header. The token is read from the live jar on every
// mutating call -- never cached -- so silent rotation is tolerated.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Cookie holding the anti-forgery token, as set by the backend.
pub const CSRF_COOKIE: &str = "csrf_token";

/// Header the token is echoed back on for state-changing verbs.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// HTTP client for the VisionGuard backend.
///
/// Cheaply cloneable; all clones share one cookie jar, which is the
/// process-wide credential store (session cookie + CSRF token).
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    jar: Arc<Jar>,
    timeout: Duration,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically (session auth requires cookies).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let jar = config
            .cookie_jar
            .clone()
            .unwrap_or_else(|| Arc::new(Jar::default()));
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            jar,
            timeout: config.timeout,
        })
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client (used by the SSE stream client).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Build a full URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    // ── Cookie access ────────────────────────────────────────────────

    /// Read the anti-forgery token fresh from the live cookie jar.
    ///
    /// Returns `None` if the backend hasn't set the cookie yet (or it was
    /// wiped on logout). Callers must not cache the result.
    pub fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let cookies = header.to_str().ok()?;
        cookies.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == CSRF_COOKIE && !value.is_empty()).then(|| value.to_owned())
        })
    }

    /// Drop a named cookie from the jar by inserting an expired replacement.
    pub(crate) fn expire_cookie(&self, name: &str) {
        self.jar
            .add_cookie_str(&format!("{name}=; Max-Age=0; Path=/"), &self.base_url);
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON response.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::decode(resp).await
    }

    /// Send a POST request with a JSON body, attaching the CSRF header.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        let req = self.http.post(url).timeout(self.timeout).json(body);
        self.send_mutating(req).await
    }

    /// Send a PUT request with a JSON body, attaching the CSRF header.
    pub(crate) async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {}", url);
        let req = self.http.put(url).timeout(self.timeout).json(body);
        self.send_mutating(req).await
    }

    /// Send a DELETE request, attaching the CSRF header.
    pub(crate) async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("DELETE {}", url);
        let req = self.http.delete(url).timeout(self.timeout);
        self.send_mutating(req).await
    }

    /// Attach the current CSRF token and send.
    ///
    /// Fails locally with [`Error::MissingCsrfToken`] when the cookie is
    /// absent -- a mutating call without a token would be rejected anyway,
    /// so it never touches the network.
    async fn send_mutating<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        let token = self.csrf_token().ok_or(Error::MissingCsrfToken)?;
        let resp = req
            .header(CSRF_HEADER, token)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::decode(resp).await
    }

    /// Map the response status, then decode the JSON body.
    ///
    /// 401 becomes [`Error::Unauthorized`]; other non-success statuses
    /// surface the backend's `{"error": "..."}` message when present.
    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

/// Pull the `error` field out of an error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let base = Url::parse("http://localhost:5000").expect("static URL");
        ApiClient::new(base, &TransportConfig::default()).expect("client builds")
    }

    #[test]
    fn csrf_token_absent_on_fresh_jar() {
        assert_eq!(client().csrf_token(), None);
    }

    #[test]
    fn csrf_token_reads_live_jar() {
        let c = client();
        c.jar
            .add_cookie_str("csrf_token=tok-1; Path=/", &c.base_url);
        assert_eq!(c.csrf_token().as_deref(), Some("tok-1"));

        // Rotation: a fresh read sees the replacement value.
        c.jar
            .add_cookie_str("csrf_token=tok-2; Path=/", &c.base_url);
        assert_eq!(c.csrf_token().as_deref(), Some("tok-2"));
    }

    #[test]
    fn expire_cookie_removes_token() {
        let c = client();
        c.jar
            .add_cookie_str("csrf_token=tok-1; Path=/", &c.base_url);
        c.expire_cookie(CSRF_COOKIE);
        assert_eq!(c.csrf_token(), None);
    }

    #[test]
    fn error_message_extraction() {
        assert_eq!(
            extract_error_message(r#"{"error": "Camera not found"}"#),
            "Camera not found"
        );
        assert_eq!(extract_error_message("plain text"), "plain text");
    }
}
