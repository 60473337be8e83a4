use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{listing, ActionResult, ActionTable, Manager, Scope, Success};
use crate::database::models::{Audit, Student};
use crate::database::{ListQuery, Store};
use crate::error::{ApiError, Context};
use crate::stack::ExecContext;
use crate::validation::parse_date;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudentInput {
    classroom_id: Option<Uuid>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    enrollment_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Transfer {
    student_id: Uuid,
    classroom_id: Uuid,
}

const NOT_FOUND: &str = "Student not found or does not belong to your school.";

/// Students of the school admin's own school
pub struct StudentManager {
    store: Arc<Store>,
}

impl StudentManager {
    pub fn new(store: Arc<Store>) -> Arc<Self> {
        Arc::new(Self { store })
    }

    async fn get_all(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.list(&ctx).await.context("Failed to retrieve students")
    }

    async fn create(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.insert(&ctx).await.context("Failed to create student")
    }

    async fn get(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.fetch(&ctx).await.context("Failed to retrieve student")
    }

    async fn update(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.modify(&ctx).await.context("Failed to update student")
    }

    async fn transfer(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.move_to_classroom(&ctx).await.context("Failed to transfer student")
    }

    async fn delete(self: Arc<Self>, ctx: ExecContext) -> ActionResult {
        self.remove(&ctx).await.context("Failed to delete student")
    }

    async fn list(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let list = ListQuery::from_query(&ctx.query());
        let page = self
            .store
            .students
            .page(&list, |s| s.school_id == scope.school_id)
            .await?;

        Ok(Success::ok(
            "Students retrieved successfully.",
            listing("students", page, &list, Some(&scope)),
        ))
    }

    async fn insert(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let input: StudentInput = ctx.body_as()?;
        let (Some(classroom_id), Some(first_name), Some(last_name), Some(email)) =
            (input.classroom_id, input.first_name, input.last_name, input.email)
        else {
            return Err(ApiError::bad_request("classroomId, firstName, lastName and email are required"));
        };

        let classroom_ok = self
            .store
            .classrooms
            .exists(|c| c.id == classroom_id && c.school_id == scope.school_id)
            .await;
        if !classroom_ok {
            return Err(ApiError::not_found("Invalid classroom for this school."));
        }

        if self.email_taken(&scope, &email, None).await {
            return Err(ApiError::bad_request("Email already exists."));
        }

        let enrollment_date = match input.enrollment_date.as_deref() {
            Some(raw) => enrollment(raw)?,
            None => Utc::now(),
        };

        let student = self
            .store
            .students
            .insert(Student {
                id: Uuid::new_v4(),
                school_id: scope.school_id,
                classroom_id: Some(classroom_id),
                first_name,
                last_name,
                email,
                enrollment_date,
                audit: Audit::new(Some(scope.user_id)),
            })
            .await;

        Ok(Success::created("Student created successfully", json!({ "student": student })))
    }

    async fn fetch(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let student = self.owned(ctx.params()?.record_id()?, &scope).await?;
        Ok(Success::ok("Student retrieved successfully", json!({ "student": student })))
    }

    async fn modify(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let id = ctx.params()?.record_id()?;
        let input: StudentInput = ctx.body_as()?;
        self.owned(id, &scope).await?;

        if let Some(email) = &input.email {
            if self.email_taken(&scope, email, Some(id)).await {
                return Err(ApiError::bad_request("Email already exists."));
            }
        }
        let enrollment_date = input.enrollment_date.as_deref().map(enrollment).transpose()?;

        let student = self
            .store
            .students
            .update(id, |student| {
                if let Some(first_name) = input.first_name {
                    student.first_name = first_name;
                }
                if let Some(last_name) = input.last_name {
                    student.last_name = last_name;
                }
                if let Some(email) = input.email {
                    student.email = email;
                }
                if let Some(date) = enrollment_date {
                    student.enrollment_date = date;
                }
                student.audit.touch(scope.user_id);
            })
            .await
            .ok_or_else(|| ApiError::bad_request("Failed to update student."))?;

        Ok(Success::ok("Student updated successfully", json!({ "student": student })))
    }

    async fn move_to_classroom(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let transfer: Transfer = ctx.body_as()?;
        tracing::info!(
            "Transferring student {} to classroom {}",
            transfer.student_id,
            transfer.classroom_id
        );

        self.owned(transfer.student_id, &scope).await?;
        let classroom_ok = self
            .store
            .classrooms
            .exists(|c| c.id == transfer.classroom_id && c.school_id == scope.school_id)
            .await;
        if !classroom_ok {
            return Err(ApiError::not_found(
                "Target classroom does not exist or does not belong to your school.",
            ));
        }

        let student = self
            .store
            .students
            .update(transfer.student_id, |student| {
                student.classroom_id = Some(transfer.classroom_id);
                student.audit.touch(scope.user_id);
            })
            .await
            .ok_or_else(|| ApiError::bad_request("Failed to transfer student."))?;

        Ok(Success::ok("Student transferred successfully.", json!({ "student": student })))
    }

    async fn remove(&self, ctx: &ExecContext) -> Result<Success, ApiError> {
        let scope = Scope::of(ctx)?;
        let id = ctx.params()?.record_id()?;
        self.store
            .students
            .delete_one(|s| s.id == id && s.school_id == scope.school_id)
            .await
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        Ok(Success::ok("Student deleted successfully.", json!({})))
    }

    async fn owned(&self, id: Uuid, scope: &Scope) -> Result<Student, ApiError> {
        self.store
            .students
            .find_one(|s| s.id == id && s.school_id == scope.school_id)
            .await
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    /// Emails are unique per school, ignoring case
    async fn email_taken(&self, scope: &Scope, email: &str, except: Option<Uuid>) -> bool {
        self.store
            .students
            .exists(|s| {
                s.school_id == scope.school_id
                    && s.email.eq_ignore_ascii_case(email)
                    && Some(s.id) != except
            })
            .await
    }
}

fn enrollment(raw: &str) -> Result<chrono::DateTime<Utc>, ApiError> {
    parse_date(raw).ok_or_else(|| ApiError::bad_request("enrollmentDate is an invalid date"))
}

impl Manager for StudentManager {
    fn name(&self) -> &'static str {
        "student"
    }

    fn http_exposed(&self) -> &'static [&'static str] {
        &[
            "get=getAll|__auth|__isSchoolAdmin",
            "post=create|__auth|__isSchoolAdmin",
            "get=get|__auth|__isSchoolAdmin|__params",
            "put=update|__auth|__isSchoolAdmin|__params",
            "patch=transfer|__auth|__isSchoolAdmin",
            "delete=delete|__auth|__isSchoolAdmin|__params",
        ]
    }

    fn actions(self: Arc<Self>) -> ActionTable {
        ActionTable::new()
            .on("getAll", &self, Self::get_all)
            .on("create", &self, Self::create)
            .on("get", &self, Self::get)
            .on("update", &self, Self::update)
            .on("transfer", &self, Self::transfer)
            .on("delete", &self, Self::delete)
    }
}
