use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{listing, ActionResult, ActionTable, Manager, Success};
use crate::auth::hash_password;
use crate::database::models::{Audit, User};
use crate::database::{ListQuery, Store};
use crate::error::{ApiError, Context};
use crate::stack::ExecContext;
use crate::types::Role;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewUser {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    role: Role,
    school_id: Option<Uuid>,
}

/// Accounts, managed by super admins
pub struct UserManager {
    store: Arc<Store>,
}

impl UserManager {
    pub fn new(store: Arc<Store>) -> Arc<Self> {
        Arc::new(Self { store })
    }

    async fn create(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.insert(&ctx).await.context("Failed to create user")
    }

    async fn get_all(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        let list = ListQuery::from_query(&ctx.query());
        let page = self
            .store
            .users
            .page(&list, |_| true)
            .await
            .context("Failed to retrieve users")?;

        Ok(Success::ok("Users fetched successfully.", listing("users", page, &list, None)))
    }

    async fn insert(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let creator = ctx.user()?.id;
        let input: NewUser = ctx.body_as()?;
        tracing::info!("Creating user {}", input.email);

        if self.store.users.exists(|u| u.email.eq_ignore_ascii_case(&input.email)).await {
            return Err(ApiError::bad_request("Email already in use."));
        }

        if input.role == Role::SchoolAdmin {
            let school_id = input
                .school_id
                .ok_or_else(|| ApiError::bad_request("schoolId is required for school_admin role."))?;
            if self.store.schools.find_by_id(school_id).await.is_none() {
                return Err(ApiError::not_found("The specified school does not exist."));
            }
        }

        let user = self
            .store
            .users
            .insert(User {
                id: Uuid::new_v4(),
                first_name: input.first_name,
                last_name: input.last_name,
                email: input.email,
                password: hash_password(&input.password),
                role: input.role,
                school_id: input.school_id,
                audit: Audit::new(Some(creator)),
            })
            .await;

        Ok(Success::created("User created successfully.", json!({ "user": user })))
    }
}

impl Manager for UserManager {
    fn name(&self) -> &'static str {
        "user"
    }

    fn http_exposed(&self) -> &'static [&'static str] {
        &[
            "post=create|__auth|__isSuperAdmin",
            "get=getAll|__auth|__isSuperAdmin",
        ]
    }

    fn actions(self: Arc<Self>) -> ActionTable {
        ActionTable::new()
            .on("create", &self, Self::create)
            .on("getAll", &self, Self::get_all)
    }
}
