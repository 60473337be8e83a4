//! Business modules. Each manager publishes an exposure list and a table of
//! actions; only actions named in the exposure list are reachable over HTTP.

pub mod auth;
pub mod classroom;
pub mod school;
pub mod seed;
pub mod student;
pub mod user;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::http::StatusCode;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::{ListQuery, Page, Pagination};
use crate::error::{ApiError, Failure};
use crate::middleware::Envelope;
use crate::stack::ExecContext;

pub use auth::AuthManager;
pub use classroom::ClassroomManager;
pub use school::SchoolManager;
pub use seed::SeedManager;
pub use student::StudentManager;
pub use user::UserManager;

/// A successful action result
#[derive(Debug, Clone, PartialEq)]
pub struct Success {
    pub message: String,
    pub data: Value,
    pub code: StatusCode,
}

impl Success {
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self::with_status(message, data, StatusCode::OK)
    }

    pub fn created(message: impl Into<String>, data: Value) -> Self {
        Self::with_status(message, data, StatusCode::CREATED)
    }

    pub fn with_status(message: impl Into<String>, data: Value, code: StatusCode) -> Self {
        Self {
            message: message.into(),
            data,
            code,
        }
    }

    pub fn into_envelope(self) -> Envelope {
        tracing::info!("{}", self.message);
        Envelope::success(self.message, self.data, self.code)
    }
}

pub type ActionResult = Result<Success, Failure>;

/// A callable action: takes the merged context as its only argument
pub type ActionFn = Arc<dyn Fn(ExecContext) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// Action name → callable, bound to one manager instance
#[derive(Default)]
pub struct ActionTable {
    actions: HashMap<&'static str, ActionFn>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `method` on `manager` under `name`
    pub fn on<M, F, Fut>(mut self, name: &'static str, manager: &Arc<M>, method: F) -> Self
    where
        M: Send + Sync + 'static,
        F: Fn(Arc<M>, ExecContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        let manager = manager.clone();
        let action: ActionFn = Arc::new(move |ctx| method(manager.clone(), ctx).boxed());
        self.actions.insert(name, action);
        self
    }

    pub fn get(&self, name: &str) -> Option<ActionFn> {
        self.actions.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// A business module the dispatcher can route to
pub trait Manager: Send + Sync + 'static {
    /// Module name, the first path segment after `/api`
    fn name(&self) -> &'static str;

    /// Allow-list of `"<verb>=<action>[|<middleware>...]"` entries
    fn http_exposed(&self) -> &'static [&'static str];

    fn actions(self: Arc<Self>) -> ActionTable;
}

/// The acting user and the school their records are confined to
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope {
    pub user_id: Uuid,
    pub school_id: Uuid,
}

impl Scope {
    pub fn of(ctx: &ExecContext) -> Result<Self, ApiError> {
        let user = ctx.user()?;
        let school_id = user
            .school_id
            .ok_or_else(|| ApiError::forbidden("User is not assigned to a school"))?;
        Ok(Self {
            user_id: user.id,
            school_id,
        })
    }
}

/// `{ <key>: [...], pagination, appliedFilters }` for list actions
pub(crate) fn listing(key: &str, page: Page, list: &ListQuery, scope: Option<&Scope>) -> Value {
    let mut filters = json!(list.filters);
    if let (Some(scope), Some(map)) = (scope, filters.as_object_mut()) {
        map.insert("schoolId".to_string(), json!(scope.school_id));
    }

    json!({
        key: page.items,
        "pagination": Pagination::new(page.total, list.page, list.limit),
        "appliedFilters": filters,
    })
}
