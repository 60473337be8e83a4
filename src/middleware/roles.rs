use std::sync::Arc;

use async_trait::async_trait;

use super::{Injectable, Middleware, MiddlewareBox, RawRequest, Step};
use crate::error::ApiError;
use crate::stack::{keys, Contribution, ExecContext};
use crate::types::Role;

/// Requires the principal set by `__auth` to hold a role
pub struct RoleMiddleware {
    name: &'static str,
    role: Role,
}

impl RoleMiddleware {
    pub fn new(name: &'static str, role: Role) -> Self {
        Self { name, role }
    }
}

pub fn super_admin(_: &Injectable) -> MiddlewareBox {
    Arc::new(RoleMiddleware::new(keys::IS_SUPER_ADMIN, Role::SuperAdmin))
}

pub fn school_admin(_: &Injectable) -> MiddlewareBox {
    Arc::new(RoleMiddleware::new(keys::IS_SCHOOL_ADMIN, Role::SchoolAdmin))
}

#[async_trait]
impl Middleware for RoleMiddleware {
    fn name(&self) -> &'static str {
        self.name
    }

    fn failure_message(&self) -> &'static str {
        "Permission denied"
    }

    async fn execute(&self, _request: &RawRequest, ctx: &ExecContext) -> Result<Step, ApiError> {
        let user = ctx.user()?;
        if user.role != self.role {
            return Err(ApiError::forbidden(format!(
                "User does not have {} privileges",
                self.role
            )));
        }

        tracing::debug!("User {} authorized as {}", user.email, self.role);
        Ok(Step::contribute(Contribution::Flag(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::stack::{Principal, RouteParams};
    use crate::types::Verb;
    use uuid::Uuid;

    fn ctx_with(role: Role) -> ExecContext {
        let mut ctx = ExecContext::new();
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            first_name: "Some".to_string(),
            last_name: "One".to_string(),
            role,
            school_id: None,
        };
        ctx.insert(keys::AUTH, Contribution::Principal(Principal { user }));
        ctx
    }

    fn request() -> RawRequest {
        RawRequest::new(Verb::Get, RouteParams::new("school", "getAll", None))
    }

    #[tokio::test]
    async fn matching_role_passes_with_flag() {
        let unit = RoleMiddleware::new(keys::IS_SUPER_ADMIN, Role::SuperAdmin);
        let step = unit.execute(&request(), &ctx_with(Role::SuperAdmin)).await.unwrap();
        assert!(matches!(step, Step::Continue(Some(Contribution::Flag(true)))));
    }

    #[tokio::test]
    async fn other_role_is_forbidden() {
        let unit = RoleMiddleware::new(keys::IS_SUPER_ADMIN, Role::SuperAdmin);
        let err = unit.execute(&request(), &ctx_with(Role::SchoolAdmin)).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), "User does not have super_admin privileges");
    }

    #[tokio::test]
    async fn missing_principal_is_unauthorized() {
        let unit = RoleMiddleware::new(keys::IS_SCHOOL_ADMIN, Role::SchoolAdmin);
        let err = unit.execute(&request(), &ExecContext::new()).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }
}
