use std::sync::Arc;

use async_trait::async_trait;

use super::{Injectable, Middleware, MiddlewareBox, RawRequest, Step};
use crate::error::ApiError;
use crate::stack::{keys, Contribution, Device, ExecContext};

/// Records the client address and user agent. Never rejects.
pub struct DeviceMiddleware;

pub fn factory(_: &Injectable) -> MiddlewareBox {
    Arc::new(DeviceMiddleware)
}

#[async_trait]
impl Middleware for DeviceMiddleware {
    fn name(&self) -> &'static str {
        keys::DEVICE
    }

    async fn execute(&self, request: &RawRequest, _ctx: &ExecContext) -> Result<Step, ApiError> {
        // First hop of x-forwarded-for is the original client
        let ip = request
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| request.header("x-real-ip"))
            .map(str::to_string);
        let agent = request.header("user-agent").map(str::to_string);

        Ok(Step::contribute(Contribution::Device(Device { ip, agent })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::RouteParams;
    use crate::types::Verb;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn reads_forwarded_address_and_agent() {
        let mut request = RawRequest::new(Verb::Get, RouteParams::new("school", "getAll", None));
        request
            .headers
            .insert("x-forwarded-for", HeaderValue::from_static("10.0.0.7, 172.16.0.1"));
        request.headers.insert("user-agent", HeaderValue::from_static("curl/8.0"));

        let step = DeviceMiddleware.execute(&request, &ExecContext::new()).await.unwrap();
        match step {
            Step::Continue(Some(Contribution::Device(device))) => {
                assert_eq!(device.ip.as_deref(), Some("10.0.0.7"));
                assert_eq!(device.agent.as_deref(), Some("curl/8.0"));
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }
}
