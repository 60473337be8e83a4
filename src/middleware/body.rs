use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Envelope, Injectable, Middleware, MiddlewareBox, RawRequest, Step};
use crate::error::ApiError;
use crate::stack::{keys, Contribution, ExecContext};
use crate::validation::ValidatorRegistry;

/// Validates the request body against the rules for `module:action`
pub struct BodyMiddleware {
    validators: Arc<ValidatorRegistry>,
}

impl BodyMiddleware {
    pub fn new(validators: Arc<ValidatorRegistry>) -> Self {
        Self { validators }
    }
}

pub fn factory(injectable: &Injectable) -> MiddlewareBox {
    Arc::new(BodyMiddleware::new(injectable.validators.clone()))
}

#[async_trait]
impl Middleware for BodyMiddleware {
    fn name(&self) -> &'static str {
        keys::BODY
    }

    fn failure_message(&self) -> &'static str {
        "Validation failed"
    }

    async fn execute(&self, request: &RawRequest, _ctx: &ExecContext) -> Result<Step, ApiError> {
        let module = &request.params.module_name;
        let action = &request.params.fn_name;

        let validator = self.validators.get(module, action).ok_or_else(|| {
            ApiError::internal_server_error(format!("Validator not found for {}:{}", module, action))
        })?;

        let body = match request.decode_body() {
            // An absent body validates as an empty object
            Ok(body) => body.unwrap_or_else(|| json!({})),
            Err(err) => return Ok(Step::Respond(Envelope::failure("Invalid request body", &err))),
        };
        if !matches!(body, Value::Object(_)) {
            return Err(ApiError::bad_request("Request body must be a JSON object"));
        }

        let errors = validator.validate(&body);
        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }

        tracing::debug!("Validation successful for {}:{}", module, action);
        Ok(Step::contribute(Contribution::Body(body)))
    }
}
