//! Test doubles for the dispatch engine: instrumented middleware units and a
//! minimal manager.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::auth::TokenManager;
use crate::config::AppConfig;
use crate::error::{ApiError, Failure};
use crate::managers::{ActionResult, ActionTable, Manager, Success};
use crate::middleware::{Envelope, Injectable, Middleware, MiddlewareBox, RawRequest, Step};
use crate::stack::{Contribution, ExecContext};
use crate::validation::ValidatorRegistry;

pub fn config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.auth_token_secret = "test-secret".to_string();
    config.security.super_admin_email = "admin@example.com".to_string();
    config.security.super_admin_password = "admin-password".to_string();
    config
}

pub fn injectable() -> Injectable {
    let config = Arc::new(config());
    Injectable {
        tokens: Arc::new(TokenManager::from_config(&config)),
        validators: Arc::new(ValidatorRegistry::standard()),
        config,
    }
}

/// How a [`Recorder`] reacts when executed
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Pass,
    /// Continue with `Flag(true)`
    Contribute,
    /// Fail with 400 unless the key is already in the context
    RequireKey(&'static str),
    Reject(u16),
    Respond,
    Sleep(Duration),
}

/// A unit that appends its name to a shared log when executed
pub struct Recorder {
    name: &'static str,
    behavior: Behavior,
    log: Arc<Mutex<Vec<&'static str>>>,
}

pub fn recorder(name: &'static str, behavior: Behavior, log: &Arc<Mutex<Vec<&'static str>>>) -> MiddlewareBox {
    Arc::new(Recorder {
        name,
        behavior,
        log: log.clone(),
    })
}

#[async_trait]
impl Middleware for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn execute(&self, _request: &RawRequest, ctx: &ExecContext) -> Result<Step, ApiError> {
        self.log.lock().unwrap().push(self.name);
        match self.behavior {
            Behavior::Pass => Ok(Step::pass()),
            Behavior::Contribute => Ok(Step::contribute(Contribution::Flag(true))),
            Behavior::RequireKey(key) if ctx.contains(key) => Ok(Step::pass()),
            Behavior::RequireKey(key) => Err(ApiError::bad_request(format!("{} missing", key))),
            Behavior::Reject(403) => Err(ApiError::forbidden("Rejected")),
            Behavior::Reject(401) => Err(ApiError::unauthorized("Rejected")),
            Behavior::Reject(_) => Err(ApiError::bad_request("Rejected")),
            Behavior::Respond => Ok(Step::Respond(Envelope::success(
                format!("Responded by {}", self.name),
                json!({}),
                axum::http::StatusCode::OK,
            ))),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(Step::pass())
            }
        }
    }
}

/// A manager with a fixed action set and a caller-chosen exposure list
pub struct WidgetManager {
    exposed: &'static [&'static str],
}

impl WidgetManager {
    pub fn with_exposure(exposed: &'static [&'static str]) -> Arc<dyn Manager> {
        Arc::new(Self { exposed })
    }

    /// Echoes the context keys it was handed
    async fn get_all(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        let keys: Vec<&str> = ctx.keys().collect();
        Ok(Success::ok("Widgets retrieved successfully.", json!({ "keys": keys })))
    }

    async fn create(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        let body = ctx.body().map_err(Failure::from)?.clone();
        Ok(Success::created("Widget created successfully.", json!({ "widget": body })))
    }

    async fn secret(self: Arc<Self>, _ctx: ExecContext) -> ActionResult {
        Ok(Success::ok("Secret", json!({})))
    }

    async fn explode(self: Arc<Self>, _ctx: ExecContext) -> ActionResult {
        panic!("widget exploded")
    }
}

impl Manager for WidgetManager {
    fn name(&self) -> &'static str {
        "widget"
    }

    fn http_exposed(&self) -> &'static [&'static str] {
        self.exposed
    }

    fn actions(self: Arc<Self>) -> ActionTable {
        ActionTable::new()
            .on("getAll", &self, Self::get_all)
            .on("create", &self, Self::create)
            .on("secret", &self, Self::secret)
            .on("explode", &self, Self::explode)
    }
}
