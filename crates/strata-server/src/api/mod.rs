//! The HTTP surface (spec §6). Routing, request/response shapes, and the
//! single error-to-status mapping live here; none of the engine's own logic
//! does (spec §10.2 "adding a new business error kind is a one-line match
//! arm").

pub mod chunks;
pub mod health;
pub mod nodes;
pub mod players;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use strata_primitives::{AuthError, EngineError, HarvestError, RegistrationError, StorageError};
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub message: String,
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> HttpResponse {
    let message = message.into();
    HttpResponse::build(status).json(ErrorBody { error: code.to_string(), code: code.to_string(), message })
}

/// Wraps an [`EngineError`] for actix's `ResponseError` machinery (spec §7
/// "Propagation").
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError(e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            EngineError::Harvest(_) => StatusCode::BAD_REQUEST,
            EngineError::Auth(_) => StatusCode::UNAUTHORIZED,
            EngineError::Registration(_) => StatusCode::BAD_REQUEST,
            EngineError::Storage(e) => storage_status(e),
        }
    }

    fn error_response(&self) -> HttpResponse {
        match &self.0 {
            EngineError::Harvest(e) => error_response(self.status_code(), harvest_code(e), e.to_string()),
            EngineError::Auth(e) => error_response(self.status_code(), auth_code(e), e.to_string()),
            EngineError::Registration(e) => error_response(self.status_code(), registration_code(e), e.to_string()),
            EngineError::Storage(e) => {
                error!(error = ?e, "internal server error");
                error_response(self.status_code(), "internal_error", "internal server error")
            }
        }
    }
}

/// Wraps an [`AuthError`] specifically, for the session middleware which
/// never holds a full `EngineError`.
#[derive(Debug)]
pub struct AuthRejection(pub AuthError);

impl std::fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        error_response(StatusCode::UNAUTHORIZED, auth_code(&self.0), self.0.to_string())
    }
}

/// Wraps a bare [`StorageError`] for handlers that talk to the store
/// directly without going through the engine (e.g. registration).
#[derive(Debug)]
pub struct StorageRejection(pub StorageError);

impl std::fmt::Display for StorageRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for StorageRejection {
    fn status_code(&self) -> StatusCode {
        storage_status(&self.0)
    }

    fn error_response(&self) -> HttpResponse {
        error!(error = ?self.0, "internal server error");
        error_response(self.status_code(), "internal_error", "internal server error")
    }
}

/// Wraps a [`RegistrationError`] for the registration handler, which can
/// fail on a pure validation/uniqueness basis without an `EngineError`.
#[derive(Debug)]
pub struct RegistrationRejection(pub RegistrationError);

impl std::fmt::Display for RegistrationRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for RegistrationRejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        error_response(StatusCode::BAD_REQUEST, registration_code(&self.0), self.0.to_string())
    }
}

fn storage_status(e: &StorageError) -> StatusCode {
    match e {
        StorageError::DeadlineExceeded => StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        StorageError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        StorageError::Backend(_) | StorageError::TransactionAborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn harvest_code(e: &HarvestError) -> &'static str {
    match e {
        HarvestError::NodeNotFound => "node_not_found",
        HarvestError::NodeNotActive => "node_not_active",
        HarvestError::NodeDepleted => "node_depleted",
        HarvestError::AlreadyHarvestedToday => "already_harvested_today",
    }
}

fn auth_code(e: &AuthError) -> &'static str {
    match e {
        AuthError::UnauthenticatedSession => "unauthenticated_session",
        AuthError::ExpiredSession => "expired_session",
        AuthError::InvalidToken => "invalid_token",
        AuthError::InvalidCredentials => "invalid_credentials",
    }
}

fn registration_code(e: &RegistrationError) -> &'static str {
    match e {
        RegistrationError::UsernameTaken => "username_taken",
        RegistrationError::EmailTaken => "email_taken",
        RegistrationError::InvalidUsername(_) => "invalid_username",
        RegistrationError::InvalidPassword(_) => "invalid_password",
        RegistrationError::InvalidEmail(_) => "invalid_email",
    }
}
