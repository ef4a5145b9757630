// bridge-server/src/error.rs
use crate::directory::DirectoryError;
use crate::firebase::VerifyError;
use crate::resolver::ResolveError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Every failure a handler can return, rendered as `{ error, details? }`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing Firebase ID token (Authorization: Bearer <token>)")]
    MissingToken,

    #[error("Missing userId")]
    MissingUserId,

    #[error("Invalid Firebase ID token")]
    InvalidToken(String),

    #[error("Firebase token project mismatch")]
    AudienceMismatch,

    #[error("User not found")]
    NotFound,

    #[error("User record is missing an email")]
    IncompleteRecord,

    #[error("Firebase Admin is not configured on the server")]
    Configuration(String),

    #[error("User lookup failed")]
    Lookup(String),

    #[error("Failed to sign Supabase JWT")]
    Signing(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    fn details(&self) -> Option<&str> {
        match self {
            Self::InvalidToken(details)
            | Self::Configuration(details)
            | Self::Lookup(details)
            | Self::Signing(details) => Some(details.as_str()),
            _ => None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingUserId => StatusCode::BAD_REQUEST,
            Self::MissingToken | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::AudienceMismatch => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::IncompleteRecord | Self::Configuration(_) | Self::Lookup(_) | Self::Signing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            details: self.details(),
        })
    }
}

/// Phrases the Google client libraries use when credentials are missing.
///
/// Only consulted for messages that arrive untyped; the Firebase verifier
/// already reports key endpoint failures as `InfrastructureUnavailable`.
pub fn looks_like_configuration_error(message: &str) -> bool {
    let msg = message.to_lowercase();
    msg.contains("google_application_credentials")
        || msg.contains("could not load the default credentials")
        || (msg.contains("credential") && msg.contains("initializeapp"))
        || msg.contains("failed to initialize")
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::InfrastructureUnavailable(msg) => Self::Configuration(msg),
            VerifyError::InvalidAssertion(msg) if looks_like_configuration_error(&msg) => Self::Configuration(msg),
            VerifyError::InvalidAssertion(msg) => Self::InvalidToken(msg),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::EmptyId => Self::MissingUserId,
            ResolveError::NotFound(_) => Self::NotFound,
            ResolveError::MissingEmail(_) => Self::IncompleteRecord,
            ResolveError::Directory(DirectoryError::Credentials(e)) => Self::Configuration(e.to_string()),
            ResolveError::Directory(e) => Self::Lookup(e.to_string()),
        }
    }
}
