use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::User;
use crate::types::Role;

/// The user snapshot carried inside a token and handed to actions as the principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<Uuid>,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            school_id: user.school_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user: AuthUser,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: AuthUser, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            user,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token generation error: {0}")]
    Generation(String),
    #[error("auth token secret is not configured")]
    MissingSecret,
}

/// Issues and verifies HS256 auth tokens
pub struct TokenManager {
    secret: String,
    expiry_hours: u64,
}

impl TokenManager {
    pub fn new(secret: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiry_hours,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.security.auth_token_secret.clone(),
            config.security.token_expiry_hours,
        )
    }

    pub fn gen_auth_token(&self, user: AuthUser) -> Result<String, TokenError> {
        self.sign(&Claims::new(user, self.expiry_hours))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), claims, &encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    pub fn verify_auth_token(&self, token: &str) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

/// Salted SHA-256 digest in the form `salt$hex`
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password).as_bytes().ct_eq(expected.as_bytes()).into(),
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            first_name: "Admin".to_string(),
            last_name: "Super".to_string(),
            role: Role::SuperAdmin,
            school_id: None,
        }
    }

    #[test]
    fn token_round_trip_preserves_user() {
        let tokens = TokenManager::new("secret", 24);
        let user = user();
        let token = tokens.gen_auth_token(user.clone()).unwrap();
        let claims = tokens.verify_auth_token(&token).unwrap();
        assert_eq!(claims.user, user);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = TokenManager::new("secret", 24);
        let now = Utc::now().timestamp();
        let claims = Claims { user: user(), iat: now - 7200, exp: now - 3600 };
        let token = tokens.sign(&claims).unwrap();
        assert!(matches!(tokens.verify_auth_token(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let token = TokenManager::new("one", 24).gen_auth_token(user()).unwrap();
        let result = TokenManager::new("two", 24).verify_auth_token(&token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn password_hash_verifies() {
        let stored = hash_password("correct horse");
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("battery staple", &stored));
        assert_ne!(hash_password("correct horse"), stored);
    }

    #[test]
    fn malformed_stored_hashes_never_verify() {
        assert!(!verify_password("pw", "no-separator"));
        assert!(!verify_password("pw", "salt$abc"));
        assert!(!verify_password("pw", "salt$"));
    }
}
