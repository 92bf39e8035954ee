use thiserror::Error;

/// View-layer error type.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The visitor is anonymous (or the session expired mid-view).
    /// Rendered as the re-login prompt, never retried silently.
    #[error("not signed in")]
    Unauthorized,

    /// The selected class filter names a label outside the fixed enumeration.
    #[error("unknown object class: {0}")]
    UnknownClass(String),

    /// Anything the wire layer reports.
    #[error(transparent)]
    Api(#[from] visionguard_api::Error),
}

impl CoreError {
    /// True when the failure calls for the unauthenticated view state.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Unauthorized => true,
            Self::Api(e) => e.is_auth_expired(),
            Self::UnknownClass(_) => false,
        }
    }
}
