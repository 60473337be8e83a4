use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use super::{ActionResult, ActionTable, Manager, Success};
use crate::auth::{verify_password, AuthUser, TokenManager};
use crate::database::Store;
use crate::error::{ApiError, Context};
use crate::stack::ExecContext;

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

/// Issues tokens for existing users
pub struct AuthManager {
    store: Arc<Store>,
    tokens: Arc<TokenManager>,
}

impl AuthManager {
    pub fn new(store: Arc<Store>, tokens: Arc<TokenManager>) -> Arc<Self> {
        Arc::new(Self { store, tokens })
    }

    async fn login(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.authenticate(&ctx).await.context("Failed to log in")
    }

    async fn authenticate(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let credentials: Credentials = ctx.body_as()?;
        let ip = ctx.device().and_then(|d| d.ip.as_deref()).unwrap_or("unknown");
        tracing::info!("Login attempt for {} from {}", credentials.email, ip);

        let user = self
            .store
            .users
            .find_one(|u| u.email.eq_ignore_ascii_case(&credentials.email))
            .await
            .filter(|u| verify_password(&credentials.password, &u.password))
            .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

        let token = self.tokens.gen_auth_token(AuthUser::from(&user))?;
        tracing::info!("User {} logged in", user.email);

        Ok(Success::ok("Login successful", json!({ "user": user, "token": token })))
    }
}

impl Manager for AuthManager {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn http_exposed(&self) -> &'static [&'static str] {
        &["post=login"]
    }

    fn actions(self: Arc<Self>) -> ActionTable {
        ActionTable::new().on("login", &self, Self::login)
    }
}
