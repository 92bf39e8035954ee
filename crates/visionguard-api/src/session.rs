// Session resolution and the anti-forgery gate
//
// The backend uses cookie-based sessions established by an external
// identity-provider redirect flow (not modeled here). This module only
// *observes* that state: `GET /me` classifies the caller, `GET /csrf-token`
// primes the anti-forgery cookie, and logout tears everything down.

use tracing::{debug, warn};
use url::Url;

use crate::client::{ApiClient, CSRF_COOKIE};
use crate::error::Error;

/// Identity-provider logout endpoint. Navigated to after local wipe so the
/// IdP session dies along with ours.
const IDP_LOGOUT_URL: &str = "https://passport.yandex.ru/passport?mode=logout";

/// Session cookie name set by the backend.
const SESSION_COOKIE: &str = "session";

// ── Session ──────────────────────────────────────────────────────────

/// Identity payload from `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Session {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Result of an identity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Authenticated(Session),
    Anonymous,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

// ── SessionGate ──────────────────────────────────────────────────────

/// Resolves authentication state and primes the anti-forgery token.
///
/// Created per view activation and consulted before anything else runs:
/// the session may have rotated or expired since the last view, so the
/// gate never caches a previous answer.
#[derive(Debug, Clone)]
pub struct SessionGate {
    client: ApiClient,
}

impl SessionGate {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Classify the current session via `GET /me`.
    ///
    /// A 401 is a normal outcome here (anonymous visitor), not an error.
    pub async fn resolve(&self) -> Result<AuthState, Error> {
        match self.client.get_json::<Session>("/me").await {
            Ok(session) => {
                debug!(email = %session.email, "session resolved");
                Ok(AuthState::Authenticated(session))
            }
            Err(Error::Unauthorized) => Ok(AuthState::Anonymous),
            Err(e) => Err(e),
        }
    }

    /// Ensure the anti-forgery cookie is present before any mutating call.
    ///
    /// If `csrf_token` is already in the jar this is a no-op; otherwise
    /// `GET /csrf-token` asks the backend to set it. Fails with
    /// [`Error::MissingCsrfToken`] if the backend responds without the
    /// cookie -- mutating calls would be rejected anyway.
    pub async fn ensure_csrf(&self) -> Result<(), Error> {
        if self.client.csrf_token().is_some() {
            return Ok(());
        }

        let url = self.client.url("/csrf-token")?;
        debug!("fetching anti-forgery token");
        let resp = self
            .client
            .http()
            .get(url)
            .send()
            .await
            .map_err(Error::Transport)?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }

        // The token arrives as a Set-Cookie, not in the body.
        if self.client.csrf_token().is_none() {
            return Err(Error::MissingCsrfToken);
        }
        Ok(())
    }

    /// End the session: server-side invalidation, then unconditional local
    /// wipe, then the identity-provider logout redirect.
    ///
    /// The local wipe happens even when the server call fails -- a stale
    /// session must never be trusted locally, while failing to invalidate
    /// server-side is recoverable (the cookie is gone, so the session is
    /// unreachable from this client either way).
    pub async fn logout(&self) -> Result<Url, Error> {
        let server_result = self.client.get_json::<serde_json::Value>("/logout").await;
        if let Err(e) = server_result {
            warn!(error = %e, "server-side logout failed; wiping local state anyway");
        }

        self.client.expire_cookie(SESSION_COOKIE);
        self.client.expire_cookie(CSRF_COOKIE);

        Url::parse(IDP_LOGOUT_URL).map_err(Error::InvalidUrl)
    }
}
