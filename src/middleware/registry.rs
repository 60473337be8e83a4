use std::collections::HashMap;
use std::sync::Arc;

use super::{auth, body, device, params, roles, MiddlewareBox};
use crate::auth::TokenManager;
use crate::config::AppConfig;
use crate::routing::RegistryError;
use crate::stack::keys;
use crate::validation::ValidatorRegistry;

/// Shared dependencies handed to every middleware factory
#[derive(Clone)]
pub struct Injectable {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenManager>,
    pub validators: Arc<ValidatorRegistry>,
}

pub type MiddlewareFactory = fn(&Injectable) -> MiddlewareBox;

/// Every unit the service ships with
const BUILTIN: &[(&str, MiddlewareFactory)] = &[
    (keys::DEVICE, device::factory),
    (keys::AUTH, auth::factory),
    (keys::IS_SUPER_ADMIN, roles::super_admin),
    (keys::IS_SCHOOL_ADMIN, roles::school_admin),
    (keys::PARAMS, params::factory),
    (keys::BODY, body::factory),
];

/// Name → constructed unit. Filled at startup, read-only afterwards.
#[derive(Default)]
pub struct MiddlewareRegistry {
    units: HashMap<String, MiddlewareBox>,
}

impl MiddlewareRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Construct every built-in unit with the shared dependencies
    pub fn load(injectable: &Injectable) -> Result<Self, RegistryError> {
        let mut registry = Self::empty();
        for (name, factory) in BUILTIN {
            let unit = factory(injectable);
            debug_assert_eq!(unit.name(), *name);
            registry.register(unit)?;
        }
        tracing::info!("Loaded {} middleware units", registry.units.len());
        Ok(registry)
    }

    pub fn register(&mut self, unit: MiddlewareBox) -> Result<(), RegistryError> {
        let name = unit.name().to_string();
        if self.units.contains_key(&name) {
            return Err(RegistryError::DuplicateMiddleware(name));
        }
        tracing::debug!("Registered middleware '{}'", name);
        self.units.insert(name, unit);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<MiddlewareBox> {
        self.units.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.units.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn load_registers_every_builtin() {
        let registry = MiddlewareRegistry::load(&testing::injectable()).unwrap();
        assert_eq!(
            registry.names(),
            vec!["__auth", "__body", "__device", "__isSchoolAdmin", "__isSuperAdmin", "__params"]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let registry_injectable = testing::injectable();
        let mut registry = MiddlewareRegistry::load(&registry_injectable).unwrap();
        let err = registry.register(params::factory(&registry_injectable)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMiddleware(name) if name == "__params"));
    }
}
