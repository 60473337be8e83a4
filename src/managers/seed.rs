use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::{ActionResult, ActionTable, Manager, Success};
use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::database::models::{Audit, User};
use crate::database::Store;
use crate::error::{ApiError, Context};
use crate::stack::ExecContext;
use crate::types::Role;

/// Bootstraps the super admin account from configuration
pub struct SeedManager {
    store: Arc<Store>,
    config: Arc<AppConfig>,
}

impl SeedManager {
    pub fn new(store: Arc<Store>, config: Arc<AppConfig>) -> Arc<Self> {
        Arc::new(Self { store, config })
    }

    async fn admin(self: Arc<Self>, _ctx: ExecContext) -> ActionResult {
        self.seed_admin().await.context("Failed to create admin user")
    }

    /// Idempotent: an existing admin is returned as-is
    pub async fn seed_admin(&self) -> Result<Success, ApiError> {
        let security = &self.config.security;
        if security.super_admin_email.is_empty() || security.super_admin_password.is_empty() {
            return Err(ApiError::internal_server_error(
                "Missing super admin credentials in the configuration",
            ));
        }

        let email = &security.super_admin_email;
        let user = match self.store.users.find_one(|u| u.email.eq_ignore_ascii_case(email)).await {
            Some(existing) => {
                tracing::info!("Admin user already seeded with email {}", email);
                existing
            }
            None => {
                let created = self
                    .store
                    .users
                    .insert(User {
                        id: Uuid::new_v4(),
                        first_name: "Admin".to_string(),
                        last_name: "Super".to_string(),
                        email: email.clone(),
                        password: hash_password(&security.super_admin_password),
                        role: Role::SuperAdmin,
                        school_id: None,
                        audit: Audit::new(None),
                    })
                    .await;
                tracing::info!("Admin user created with email {}", email);
                created
            }
        };

        Ok(Success::created("Admin user created successfully.", json!({ "user": user })))
    }
}

impl Manager for SeedManager {
    fn name(&self) -> &'static str {
        "seed"
    }

    fn http_exposed(&self) -> &'static [&'static str] {
        &["get=admin"]
    }

    fn actions(self: Arc<Self>) -> ActionTable {
        ActionTable::new().on("admin", &self, Self::admin)
    }
}
