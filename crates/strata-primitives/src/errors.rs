//! Error kinds surfaced by the core (spec §7).

use thiserror::Error;

/// Business errors from the harvest engine. 400-class at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HarvestError {
    #[error("node not found")]
    NodeNotFound,
    #[error("node not active")]
    NodeNotActive,
    #[error("node depleted")]
    NodeDepleted,
    #[error("already harvested today")]
    AlreadyHarvestedToday,
}

/// Session/authentication errors. 401-class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("unauthenticated session")]
    UnauthenticatedSession,
    #[error("expired session")]
    ExpiredSession,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Player-registration validation errors. 400-class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("email is already taken")]
    EmailTaken,
    #[error("invalid username: {0}")]
    InvalidUsername(String),
    #[error("invalid password: {0}")]
    InvalidPassword(String),
    #[error("invalid email: {0}")]
    InvalidEmail(String),
}

/// Infrastructure-level failure. 500-class; never retried by the engine
/// itself (spec §7: "retried at the caller's discretion").
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
    #[error("operation cancelled")]
    Cancelled,
}

impl StorageError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Top-level error returned by engine operations that can fail for either a
/// business reason or an infrastructure reason.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Harvest(#[from] HarvestError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
