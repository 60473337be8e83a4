use std::sync::Arc;

use async_trait::async_trait;

use super::{Injectable, Middleware, MiddlewareBox, RawRequest, Step};
use crate::auth::TokenManager;
use crate::error::ApiError;
use crate::stack::{keys, Contribution, ExecContext, Principal};

/// Verifies the bearer token and contributes the principal
pub struct AuthMiddleware {
    tokens: Arc<TokenManager>,
}

pub fn factory(injectable: &Injectable) -> MiddlewareBox {
    Arc::new(AuthMiddleware {
        tokens: injectable.tokens.clone(),
    })
}

#[async_trait]
impl Middleware for AuthMiddleware {
    fn name(&self) -> &'static str {
        keys::AUTH
    }

    fn failure_message(&self) -> &'static str {
        "Unauthorized"
    }

    async fn execute(&self, request: &RawRequest, _ctx: &ExecContext) -> Result<Step, ApiError> {
        let header = request
            .header("authorization")
            .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

        // "Bearer <token>": anything without a second segment is malformed
        let token = header
            .split(' ')
            .nth(1)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Token format is invalid"))?;

        let claims = self.tokens.verify_auth_token(token)?;
        tracing::debug!("Authorization token verified for {}", claims.user.email);

        Ok(Step::contribute(Contribution::Principal(Principal { user: claims.user })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::stack::RouteParams;
    use crate::types::{Role, Verb};
    use axum::http::HeaderValue;
    use uuid::Uuid;

    fn middleware() -> AuthMiddleware {
        AuthMiddleware {
            tokens: Arc::new(TokenManager::new("test-secret", 1)),
        }
    }

    fn request(authorization: Option<&str>) -> RawRequest {
        let mut request = RawRequest::new(Verb::Get, RouteParams::new("school", "getAll", None));
        if let Some(value) = authorization {
            request
                .headers
                .insert("authorization", HeaderValue::from_str(value).unwrap());
        }
        request
    }

    async fn rejection(authorization: Option<&str>) -> String {
        middleware()
            .execute(&request(authorization), &ExecContext::new())
            .await
            .unwrap_err()
            .message()
    }

    #[tokio::test]
    async fn rejects_missing_and_malformed_headers() {
        assert_eq!(rejection(None).await, "No token provided");
        assert_eq!(rejection(Some("Bearer")).await, "Token format is invalid");
        assert_eq!(rejection(Some("Bearer not-a-jwt")).await, "Invalid token");
    }

    #[tokio::test]
    async fn contributes_principal_for_valid_token() {
        let auth = middleware();
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            first_name: "Admin".to_string(),
            last_name: "Super".to_string(),
            role: Role::SuperAdmin,
            school_id: None,
        };
        let token = auth.tokens.gen_auth_token(user.clone()).unwrap();
        let header = format!("Bearer {}", token);

        let step = auth.execute(&request(Some(&header)), &ExecContext::new()).await.unwrap();
        match step {
            Step::Continue(Some(Contribution::Principal(principal))) => assert_eq!(principal.user, user),
            other => panic!("unexpected step: {:?}", other),
        }
    }
}
