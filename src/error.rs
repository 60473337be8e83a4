// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse};

use crate::middleware::response::Envelope;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    Validation(Vec<String>),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 504 Gateway Timeout (a pipeline step overran its deadline)
    GatewayTimeout(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Validation(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::GatewayTimeout(_) => 504,
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(errors) => errors.join("; "),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::GatewayTimeout(msg) => msg.clone(),
        }
    }

    /// Error lines for the envelope's `errors` array. Never empty.
    pub fn errors(&self) -> Vec<String> {
        match self {
            ApiError::Validation(errors) if !errors.is_empty() => errors.clone(),
            ApiError::Validation(_) => vec!["Validation failed".to_string()],
            _ => {
                let message = self.message();
                if message.is_empty() {
                    vec![self.summary().to_string()]
                } else {
                    vec![message]
                }
            }
        }
    }

    /// Short summary used when no caller-supplied message is available
    pub fn summary(&self) -> &'static str {
        self.status().canonical_reason().unwrap_or("Error")
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation(errors: Vec<String>) -> Self {
        ApiError::Validation(errors)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        ApiError::GatewayTimeout(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::database::StoreError> for ApiError {
    fn from(err: crate::database::StoreError) -> Self {
        // Don't expose storage internals to clients
        tracing::error!("Store error: {}", err);
        ApiError::internal_server_error("An error occurred while processing your request")
    }
}

impl From<crate::auth::TokenError> for ApiError {
    fn from(err: crate::auth::TokenError) -> Self {
        match err {
            crate::auth::TokenError::Expired => ApiError::unauthorized("Token has expired"),
            crate::auth::TokenError::Invalid(reason) => {
                tracing::debug!("Token rejected: {}", reason);
                ApiError::unauthorized("Invalid token")
            }
            crate::auth::TokenError::Generation(reason) => {
                tracing::error!("Token generation failed: {}", reason);
                ApiError::internal_server_error("Failed to issue token")
            }
            crate::auth::TokenError::MissingSecret => {
                tracing::error!("Auth token secret is not configured");
                ApiError::internal_server_error("Token service is not configured")
            }
        }
    }
}

impl From<crate::routing::RouteError> for ApiError {
    fn from(err: crate::routing::RouteError) -> Self {
        ApiError::not_found(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_request(format!("Malformed request data: {}", err))
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        Envelope::failure(self.summary(), &self).into_response()
    }
}

/// A failed business action: the action's summary message plus the classified cause.
///
/// Renders as `{ ok: false, message, errors: [...], code }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub message: String,
    pub error: ApiError,
}

impl Failure {
    pub fn new(message: impl Into<String>, error: ApiError) -> Self {
        Self {
            message: message.into(),
            error,
        }
    }

    pub fn into_envelope(self) -> Envelope {
        if self.error.status_code() >= 500 {
            tracing::error!("{}: {}", self.message, self.error);
        } else {
            tracing::warn!("{}: {}", self.message, self.error);
        }
        Envelope::failure(self.message, &self.error)
    }
}

impl From<ApiError> for Failure {
    fn from(error: ApiError) -> Self {
        Self::new(error.summary(), error)
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.message, self.error)
    }
}

impl std::error::Error for Failure {}

/// Attach an action summary to any error convertible into [`ApiError`]
pub trait Context<T> {
    fn context(self, message: impl Into<String>) -> Result<T, Failure>;
}

impl<T, E: Into<ApiError>> Context<T> for Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T, Failure> {
        self.map_err(|e| Failure::new(message, e.into()))
    }
}
