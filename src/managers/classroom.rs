use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{listing, ActionResult, ActionTable, Manager, Scope, Success};
use crate::database::models::{Audit, Classroom};
use crate::database::{ListQuery, Store};
use crate::error::{ApiError, Context};
use crate::stack::ExecContext;

#[derive(Debug, Deserialize)]
struct ClassroomInput {
    name: Option<String>,
    capacity: Option<f64>,
    resources: Option<Vec<String>>,
}

const NOT_FOUND: &str = "Classroom not found or does not belong to your school.";

/// Classrooms of the school admin's own school
pub struct ClassroomManager {
    store: Arc<Store>,
}

impl ClassroomManager {
    pub fn new(store: Arc<Store>) -> Arc<Self> {
        Arc::new(Self { store })
    }

    async fn get_all(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.list(&ctx).await.context("Failed to retrieve classrooms")
    }

    async fn create(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.insert(&ctx).await.context("Failed to create classroom")
    }

    async fn get(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.fetch(&ctx).await.context("Failed to retrieve classroom")
    }

    async fn update(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.modify(&ctx).await.context("Failed to update classroom")
    }

    async fn delete(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.remove(&ctx).await.context("Failed to delete classroom")
    }

    async fn list(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let list = ListQuery::from_query(&ctx.query());
        let page = self
            .store
            .classrooms
            .page(&list, |c| c.school_id == scope.school_id)
            .await?;

        Ok(Success::ok(
            "Classrooms retrieved successfully.",
            listing("classrooms", page, &list, Some(&scope)),
        ))
    }

    async fn insert(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let input: ClassroomInput = ctx.body_as()?;
        let name = input.name.ok_or_else(|| ApiError::bad_request("name is required"))?;
        tracing::info!("Creating classroom {} for school {}", name, scope.school_id);

        if self.store.schools.find_by_id(scope.school_id).await.is_none() {
            return Err(ApiError::not_found("School not found."));
        }

        let taken = self
            .store
            .classrooms
            .exists(|c| c.school_id == scope.school_id && c.name == name)
            .await;
        if taken {
            return Err(ApiError::bad_request(
                "Classroom with this name already exists in the specified school.",
            ));
        }

        let classroom = self
            .store
            .classrooms
            .insert(Classroom {
                id: Uuid::new_v4(),
                school_id: scope.school_id,
                name,
                capacity: capacity(input.capacity)?.unwrap_or_default(),
                resources: input.resources.unwrap_or_default(),
                audit: Audit::new(Some(scope.user_id)),
            })
            .await;

        Ok(Success::created("Classroom created successfully.", json!({ "classroom": classroom })))
    }

    async fn fetch(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let classroom = self.owned(ctx.params()?.record_id()?, &scope).await?;
        Ok(Success::ok("Classroom retrieved successfully.", json!({ "classroom": classroom })))
    }

    async fn modify(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let id = ctx.params()?.record_id()?;
        let input: ClassroomInput = ctx.body_as()?;
        self.owned(id, &scope).await?;

        if let Some(name) = &input.name {
            let clash = self
                .store
                .classrooms
                .exists(|c| c.school_id == scope.school_id && &c.name == name && c.id != id)
                .await;
            if clash {
                return Err(ApiError::bad_request("Classroom with this name already exists."));
            }
        }

        let capacity = capacity(input.capacity)?;
        let classroom = self
            .store
            .classrooms
            .update(id, |classroom| {
                if let Some(name) = input.name {
                    classroom.name = name;
                }
                if let Some(capacity) = capacity {
                    classroom.capacity = capacity;
                }
                if let Some(resources) = input.resources {
                    classroom.resources = resources;
                }
                classroom.audit.touch(scope.user_id);
            })
            .await
            .ok_or_else(|| ApiError::not_found("Failed to update classroom."))?;

        Ok(Success::ok("Classroom updated successfully.", json!({ "classroom": classroom })))
    }

    async fn remove(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let id = ctx.params()?.record_id()?;
        self.owned(id, &scope).await?;

        self.store
            .classrooms
            .delete_one(|c| c.id == id)
            .await
            .ok_or_else(|| ApiError::not_found("Failed to delete classroom."))?;

        Ok(Success::ok("Classroom deleted successfully.", json!({})))
    }

    async fn owned(&self, id: Uuid, scope: &Scope) -> Result<Classroom, ApiError> {
        self.store
            .classrooms
            .find_one(|c| c.id == id && c.school_id == scope.school_id)
            .await
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }
}

fn capacity(value: Option<f64>) -> Result<Option<u32>, ApiError> {
    match value {
        None => Ok(None),
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(Some(n as u32)),
        Some(_) => Err(ApiError::bad_request("capacity must be a non-negative whole number")),
    }
}

impl Manager for ClassroomManager {
    fn name(&self) -> &'static str {
        "classroom"
    }

    fn http_exposed(&self) -> &'static [&'static str] {
        &[
            "get=getAll|__auth|__isSchoolAdmin",
            "post=create|__auth|__isSchoolAdmin",
            "get=get|__auth|__isSchoolAdmin|__params",
            "put=update|__auth|__isSchoolAdmin|__params",
            "delete=delete|__auth|__isSchoolAdmin|__params",
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
