use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::stack::keys;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub stack: StackConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service_name: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub auth_token_secret: String,
    pub token_expiry_hours: u64,
    pub super_admin_email: String,
    pub super_admin_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Middleware names run in front of every route, in order
    pub pre_stack: Vec<String>,
    pub middleware_timeout_ms: u64,
}

impl StackConfig {
    pub fn middleware_timeout(&self) -> Duration {
        Duration::from_millis(self.middleware_timeout_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server overrides
        if let Ok(v) = env::var("SERVICE_NAME") {
            self.server.service_name = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            self.server.port = v
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "SERVER_PORT", value: v })?;
        }

        // Security overrides
        if let Ok(v) = env::var("AUTH_TOKEN_SECRET") {
            self.security.auth_token_secret = v;
        }
        if let Ok(v) = env::var("AUTH_TOKEN_EXPIRY_HOURS") {
            self.security.token_expiry_hours = v.parse().unwrap_or(self.security.token_expiry_hours);
        }
        if let Ok(v) = env::var("SUPER_ADMIN_EMAIL") {
            self.security.super_admin_email = v;
        }
        if let Ok(v) = env::var("SUPER_ADMIN_PASSWORD") {
            self.security.super_admin_password = v;
        }

        // Stack overrides
        if let Ok(v) = env::var("STACK_PRE_STACK") {
            self.stack.pre_stack = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("STACK_MIDDLEWARE_TIMEOUT_MS") {
            self.stack.middleware_timeout_ms = v.parse().unwrap_or(self.stack.middleware_timeout_ms);
        }

        Ok(self)
    }

    /// Fail fast on settings the service cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.auth_token_secret.is_empty() {
            return Err(ConfigError::Missing("AUTH_TOKEN_SECRET"));
        }
        if self.security.super_admin_email.is_empty() {
            return Err(ConfigError::Missing("SUPER_ADMIN_EMAIL"));
        }
        if self.security.super_admin_password.is_empty() {
            return Err(ConfigError::Missing("SUPER_ADMIN_PASSWORD"));
        }
        if self.stack.middleware_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "STACK_MIDDLEWARE_TIMEOUT_MS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                service_name: "schoolhouse-api".to_string(),
                port: 5111,
            },
            security: SecurityConfig {
                auth_token_secret: String::new(),
                token_expiry_hours: 24,
                super_admin_email: String::new(),
                super_admin_password: String::new(),
            },
            stack: StackConfig {
                pre_stack: vec![keys::DEVICE.to_string()],
                middleware_timeout_ms: 10_000,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            stack: StackConfig {
                pre_stack: vec![keys::DEVICE.to_string()],
                middleware_timeout_ms: 5_000,
            },
            ..Self::development()
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            security: SecurityConfig {
                token_expiry_hours: 12,
                ..Self::development().security
            },
            stack: StackConfig {
                pre_stack: vec![keys::DEVICE.to_string()],
                middleware_timeout_ms: 3_000,
            },
            ..Self::development()
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> AppConfig {
        let mut config = AppConfig::development();
        config.security.auth_token_secret = "secret".to_string();
        config.security.super_admin_email = "admin@example.com".to_string();
        config.security.super_admin_password = "admin-password".to_string();
        config
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 5111);
        assert_eq!(config.stack.pre_stack, vec!["__device".to_string()]);
        assert!(config.is_development());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.security.token_expiry_hours, 12);
        assert_eq!(config.stack.middleware_timeout(), Duration::from_millis(3_000));
    }

    #[test]
    fn test_validate_requires_secret_and_admin() {
        assert!(matches!(
            AppConfig::development().validate(),
            Err(ConfigError::Missing("AUTH_TOKEN_SECRET"))
        ));

        let mut config = complete();
        config.security.super_admin_password.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("SUPER_ADMIN_PASSWORD"))
        ));

        assert!(complete().validate().is_ok());
    }
}
