//! Single HTTP entry point for `/api/:module/:action[/:id]`.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
};
use futures::FutureExt;

use crate::error::ApiError;
use crate::middleware::{Envelope, RawRequest};
use crate::routing::RouteTable;
use crate::stack::{keys, Contribution, ExecContext, QueryParams, RouteParams, VirtualStack};
use crate::types::Verb;

pub struct Dispatcher {
    routes: Arc<RouteTable>,
    stack: VirtualStack,
}

impl Dispatcher {
    pub fn new(routes: Arc<RouteTable>, stack: VirtualStack) -> Self {
        Self { routes, stack }
    }

    /// Resolve and run one request. Always yields an envelope.
    pub async fn dispatch(&self, request: RawRequest) -> Envelope {
        let params = &request.params;
        tracing::info!("Dispatching {} {}:{}", request.verb, params.module_name, params.fn_name);

        let entry = match self.routes.lookup(&params.module_name, request.verb, &params.fn_name) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("Route lookup failed: {}", err);
                return Envelope::failure("Route not found", &ApiError::from(err));
            }
        };

        // Reserved keys, visible to every unit and the action
        let mut ctx = ExecContext::new();
        ctx.insert(keys::PARAMS, Contribution::Params(request.params.clone()));
        ctx.insert(keys::QUERY, Contribution::Query(request.query.clone()));

        let handler = entry.handler.clone();
        let run = self.stack.run(&entry.units, &request, ctx, move |ctx| handler(ctx));

        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(outcome) => {
                tracing::debug!(
                    "Request {}:{} ended {:?} after {:?}",
                    entry.module,
                    entry.action,
                    outcome.state,
                    outcome.executed
                );
                outcome.envelope
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    "Request {} {}:{} panicked: {}",
                    request.verb,
                    entry.module,
                    entry.action,
                    reason
                );
                Envelope::failure(
                    "Internal server error",
                    &ApiError::internal_server_error("An unexpected error occurred"),
                )
            }
        }
    }
}

/// Axum handler bound to both dispatch routes
pub async fn handle(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: Method,
    Path(segments): Path<HashMap<String, String>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(verb) = Verb::from_method(&method) else {
        let err = ApiError::not_found(format!("Method {} is not supported", method));
        return Envelope::failure("Route not found", &err).into_response();
    };

    let params = RouteParams::new(
        segments.get("module").cloned().unwrap_or_default(),
        segments.get("action").cloned().unwrap_or_default(),
        segments.get("id").cloned(),
    );

    let request = RawRequest {
        verb,
        headers,
        params,
        query: query.as_deref().map(QueryParams::parse).unwrap_or_default(),
        body,
    };

    dispatcher.dispatch(request).await.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareRegistry;
    use crate::testing::{self, WidgetManager};
    use std::time::Duration;

    fn dispatcher(exposed: &'static [&'static str]) -> Dispatcher {
        let registry = MiddlewareRegistry::load(&testing::injectable()).unwrap();
        let routes = RouteTable::build(
            vec![WidgetManager::with_exposure(exposed)],
            &registry,
            &[keys::DEVICE.to_string()],
        )
        .unwrap();
        Dispatcher::new(Arc::new(routes), VirtualStack::new(Duration::from_secs(1)))
    }

    fn request(verb: Verb, action: &str) -> RawRequest {
        RawRequest::new(verb, RouteParams::new("widget", action, None))
    }

    #[tokio::test]
    async fn unknown_module_and_unexposed_action_are_404() {
        let dispatcher = dispatcher(&["get=getAll"]);

        let envelope = dispatcher
            .dispatch(RawRequest::new(Verb::Get, RouteParams::new("gadget", "getAll", None)))
            .await;
        assert_eq!(envelope.code, 404);

        let envelope = dispatcher.dispatch(request(Verb::Get, "secret")).await;
        assert!(!envelope.ok);
        assert_eq!(envelope.code, 404);
    }

    #[tokio::test]
    async fn reserved_keys_are_seeded() {
        let dispatcher = dispatcher(&["get=getAll"]);
        let envelope = dispatcher.dispatch(request(Verb::Get, "getAll")).await;
        assert!(envelope.ok);
        assert_eq!(envelope.data["keys"], serde_json::json!(["__device", "__params", "__query"]));
    }

    #[tokio::test]
    async fn panicking_action_becomes_500() {
        let dispatcher = dispatcher(&["get=explode"]);
        let envelope = dispatcher.dispatch(request(Verb::Get, "explode")).await;
        assert!(!envelope.ok);
        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.errors, vec!["An unexpected error occurred"]);
    }

    #[tokio::test]
    async fn routing_runs_before_the_body_is_read() {
        let dispatcher = dispatcher(&["get=getAll"]);

        let mut unknown = RawRequest::new(Verb::Post, RouteParams::new("gadget", "create", None));
        unknown.body = Bytes::from_static(b"hello");
        let envelope = dispatcher.dispatch(unknown).await;
        assert_eq!(envelope.code, 404);
        assert_eq!(envelope.message, "Route not found");

        // Routes without __body never decode it
        let mut get = request(Verb::Get, "getAll");
        get.body = Bytes::from_static(b"not json");
        assert!(dispatcher.dispatch(get).await.ok);
    }
}
