use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Uniform response body for every `/api` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub ok: bool,
    pub message: String,
    pub data: Value,
    pub errors: Vec<String>,
    pub code: u16,
}

impl Envelope {
    pub fn success(message: impl Into<String>, data: Value, status: StatusCode) -> Self {
        Self {
            ok: true,
            message: message.into(),
            data: if data.is_null() { json!({}) } else { data },
            errors: Vec::new(),
            code: status.as_u16(),
        }
    }

    /// Failure envelope: summary message plus the cause's error lines
    pub fn failure(message: impl Into<String>, error: &ApiError) -> Self {
        Self {
            ok: false,
            message: message.into(),
            data: json!({}),
            errors: error.errors(),
            code: error.status_code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_normalizes_null_data() {
        let envelope = Envelope::success("School deleted successfully.", Value::Null, StatusCode::OK);
        assert!(envelope.ok);
        assert_eq!(envelope.data, json!({}));
        assert!(envelope.errors.is_empty());
        assert_eq!(envelope.code, 200);
    }

    #[test]
    fn failure_carries_status_and_errors() {
        let envelope = Envelope::failure("Unauthorized", &ApiError::unauthorized("No token provided"));
        assert!(!envelope.ok);
        assert_eq!(envelope.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(envelope.errors, vec!["No token provided"]);
    }
}
