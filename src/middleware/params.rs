use std::sync::Arc;

use async_trait::async_trait;

use super::{Injectable, Middleware, MiddlewareBox, RawRequest, Step};
use crate::error::ApiError;
use crate::stack::{keys, Contribution, ExecContext};

/// Requires a well-formed `id` path segment
pub struct ParamsMiddleware;

pub fn factory(_: &Injectable) -> MiddlewareBox {
    Arc::new(ParamsMiddleware)
}

#[async_trait]
impl Middleware for ParamsMiddleware {
    fn name(&self) -> &'static str {
        keys::PARAMS
    }

    fn failure_message(&self) -> &'static str {
        "Validation failed"
    }

    async fn execute(&self, request: &RawRequest, _ctx: &ExecContext) -> Result<Step, ApiError> {
        let id = request.params.record_id()?;
        tracing::debug!(
            "Valid id {} for {}:{}",
            id,
            request.params.module_name,
            request.params.fn_name
        );
        Ok(Step::contribute(Contribution::Params(request.params.clone())))
    }
}
