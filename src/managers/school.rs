use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{listing, ActionResult, ActionTable, Manager, Success};
use crate::database::models::{Audit, School};
use crate::database::{ListQuery, Store};
use crate::error::{ApiError, Context};
use crate::stack::ExecContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchoolInput {
    name: Option<String>,
    address: Option<String>,
    contact_email: Option<String>,
    phone: Option<String>,
}

/// Schools, managed by super admins
pub struct SchoolManager {
    store: Arc<Store>,
}

impl SchoolManager {
    pub fn new(store: Arc<Store>) -> Arc<Self> {
        Arc::new(Self { store })
    }

    async fn get_all(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        let list = ListQuery::from_query(&ctx.query());
        tracing::info!(
            "Fetching schools: page {}, limit {}, sortBy {}",
            list.page,
            list.limit,
            list.sort_by
        );

        let page = self
            .store
            .schools
            .page(&list, |_| true)
            .await
            .context("Failed to retrieve schools")?;

        Ok(Success::ok(
            "Schools retrieved successfully.",
            listing("schools", page, &list, None),
        ))
    }

    async fn create(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.insert(&ctx).await.context("Failed to create school")
    }

    async fn get(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.fetch(&ctx).await.context("Failed to retrieve school")
    }

    async fn update(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.modify(&ctx).await.context("Failed to update school")
    }

    async fn delete(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.remove(&ctx).await.context("Failed to delete school")
    }

    async fn insert(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let user = ctx.user()?;
        let input: SchoolInput = ctx.body_as()?;
        let name = input.name.ok_or_else(|| ApiError::bad_request("name is required"))?;
        tracing::info!("Creating school {}", name);

        if self.store.schools.exists(|s| s.name == name).await {
            return Err(ApiError::bad_request("School with this name already exists."));
        }

        let school = self
            .store
            .schools
            .insert(School {
                id: Uuid::new_v4(),
                name,
                address: input.address,
                contact_email: input.contact_email,
                phone: input.phone,
                audit: Audit::new(Some(user.id)),
            })
            .await;

        Ok(Success::created("School created successfully.", json!({ "school": school })))
    }

    async fn fetch(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let id = ctx.params()?.record_id()?;
        let school = self
            .store
            .schools
            .find_by_id(id)
            .await
            .ok_or_else(|| ApiError::not_found("School not found."))?;

        Ok(Success::ok("School retrieved successfully.", json!({ "school": school })))
    }

    async fn modify(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let user_id = ctx.user()?.id;
        let id = ctx.params()?.record_id()?;
        let input: SchoolInput = ctx.body_as()?;

        if let Some(name) = &input.name {
            let clash = self.store.schools.exists(|s| &s.name == name && s.id != id).await;
            if clash {
                return Err(ApiError::bad_request("School with this name already exists."));
            }
        }

        let school = self
            .store
            .schools
            .update(id, |school| {
                if let Some(name) = input.name {
                    school.name = name;
                }
                if input.address.is_some() {
                    school.address = input.address;
                }
                if input.contact_email.is_some() {
                    school.contact_email = input.contact_email;
                }
                if input.phone.is_some() {
                    school.phone = input.phone;
                }
                school.audit.touch(user_id);
            })
            .await
            .ok_or_else(|| ApiError::not_found("School not found."))?;

        Ok(Success::ok("School updated successfully.", json!({ "school": school })))
    }

    async fn remove(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let id = ctx.params()?.record_id()?;
        self.store
            .schools
            .delete_one(|s| s.id == id)
            .await
            .ok_or_else(|| ApiError::not_found("School not found."))?;

        Ok(Success::ok("School deleted successfully.", json!(null)))
    }
}

impl Manager for SchoolManager {
    fn name(&self) -> &'static str {
        "school"
    }

    fn http_exposed(&self) -> &'static [&'static str] {
        &[
            "get=getAll|__auth|__isSuperAdmin",
            "post=create|__auth|__isSuperAdmin",
            "get=get|__auth|__isSuperAdmin|__params",
            "put=update|__auth|__isSuperAdmin|__params",
            "delete=delete|__auth|__isSuperAdmin|__params",
        ]
    }

    fn actions(self: Arc<Self>) -> ActionTable {
        ActionTable::new()
            .on("getAll", &self, Self::get_all)
            .on("create", &self, Self::create)
            .on("get", &self, Self::get)
            .on("update", &self, Self::update)
            .on("delete", &self, Self::delete)
    }
}
