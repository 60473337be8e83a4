//! Middleware units: named async guards and transforms run before an action.
//!
//! A unit either continues the chain (optionally contributing a value that is
//! stored in the execution context under the unit's name), writes a response
//! itself, or fails with an [`ApiError`] that ends the request.

pub mod auth;
pub mod body;
pub mod device;
pub mod params;
pub mod registry;
pub mod response;
pub mod roles;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::{header, HeaderMap},
};
use serde_json::{map::Entry, Map, Value};

use crate::error::ApiError;
use crate::stack::{Contribution, ExecContext, QueryParams, RouteParams};
use crate::types::Verb;

pub use registry::{Injectable, MiddlewareFactory, MiddlewareRegistry};
pub use response::Envelope;

/// The inbound request as seen by middleware units.
///
/// The body stays raw until a unit asks for it, so routes that never read it
/// accept whatever the client sent.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub verb: Verb,
    pub headers: HeaderMap,
    pub params: RouteParams,
    pub query: QueryParams,
    pub body: Bytes,
}

impl RawRequest {
    pub fn new(verb: Verb, params: RouteParams) -> Self {
        Self {
            verb,
            headers: HeaderMap::new(),
            params,
            query: QueryParams::default(),
            body: Bytes::new(),
        }
    }

    /// Attach a JSON body, as a client sending `application/json` would
    pub fn with_json(mut self, body: &Value) -> Self {
        self.headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        self.body = Bytes::from(body.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body by content type. Blank bodies are absent; form
    /// bodies become an object of strings; anything else must be JSON.
    pub fn decode_body(&self) -> Result<Option<Value>, ApiError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        if self.is_form() {
            return Ok(Some(form_object(&self.body)));
        }
        serde_json::from_slice(&self.body).map(Some).map_err(ApiError::from)
    }

    fn is_form(&self) -> bool {
        self.header(header::CONTENT_TYPE.as_str())
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
            .unwrap_or(false)
    }
}

/// Repeated keys, or keys ending in `[]`, collect into arrays
fn form_object(bytes: &[u8]) -> Value {
    let mut object = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        let (key, listed) = match key.strip_suffix("[]") {
            Some(stripped) => (stripped.to_string(), true),
            None => (key.to_string(), false),
        };
        let value = Value::String(value.into_owned());
        match object.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(if listed { Value::Array(vec![value]) } else { value });
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(items) => items.push(value),
                existing => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            },
        }
    }
    Value::Object(object)
}

/// What a unit hands back to the stack
#[derive(Debug)]
pub enum Step {
    /// Advance; `Some` stores the contribution under the unit's name
    Continue(Option<Contribution>),
    /// Stop here and send this envelope
    Respond(Envelope),
}

impl Step {
    pub fn pass() -> Self {
        Step::Continue(None)
    }

    pub fn contribute(value: Contribution) -> Self {
        Step::Continue(Some(value))
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    /// Unit name, also the context key for its contribution
    fn name(&self) -> &'static str;

    /// Summary message used when `execute` fails
    fn failure_message(&self) -> &'static str {
        "Request rejected"
    }

    async fn execute(&self, request: &RawRequest, ctx: &ExecContext) -> Result<Step, ApiError>;
}

pub type MiddlewareBox = Arc<dyn Middleware>;
