//! Failure taxonomy for privileged admin actions.

/// Every way a privileged action can fail, with its HTTP-style status.
///
/// `Internal` wraps collaborator errors (store, codec) whose text must never
/// reach the caller; its `Display` is a fixed string.
#[derive(thiserror::Error, Debug)]
pub enum AdminError {
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadInput(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("x-idempotency-key is required")]
    MissingIdempotencyKey,
    #[error("Internal error")]
    Internal(anyhow::Error),
}

impl AdminError {
    pub fn status(&self) -> u16 {
        match self {
            AdminError::Unauthenticated => 401,
            AdminError::Forbidden(_) => 403,
            AdminError::BadInput(_) | AdminError::MissingIdempotencyKey => 400,
            AdminError::NotFound(_) => 404,
            AdminError::Conflict(_) => 409,
            AdminError::Internal(_) => 500,
        }
    }

    /// Wrap a collaborator failure. The source is kept for logs, not for callers.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        AdminError::Internal(anyhow::anyhow!("{err}"))
    }
}

impl From<sled::Error> for AdminError {
    fn from(err: sled::Error) -> Self {
        AdminError::internal(err)
    }
}
