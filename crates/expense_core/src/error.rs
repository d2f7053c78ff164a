use thiserror::Error;

/// Error taxonomy shared by every project-scoped operation.
///
/// The first four kinds are expected outcomes and are surfaced verbatim.
/// `Internal` covers everything else; its detail is logged, never returned.
#[derive(Debug, Error)]
pub enum ExpenseError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ExpenseError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::BadRequest(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable kind, used as the `error` field of HTTP bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal",
        }
    }

    /// Message safe to show a caller. Internal failures collapse to a generic text.
    pub fn public_message(&self) -> String {
        match self {
            Self::NotFound(m) | Self::Forbidden(m) | Self::Conflict(m) | Self::BadRequest(m) => {
                m.clone()
            }
            Self::Internal(_) => "internal server error".into(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
