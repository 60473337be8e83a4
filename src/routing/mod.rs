//! Route table: each manager's exposure list parsed into route entries,
//! with the middleware chain resolved once at startup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::managers::{ActionFn, Manager};
use crate::middleware::{MiddlewareBox, MiddlewareRegistry};
use crate::stack::keys;
use crate::types::Verb;

/// Startup failures while building the registry or route table
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("middleware '{0}' is registered twice")]
    DuplicateMiddleware(String),
    #[error("middleware '{name}' required by {module}:{action} is not registered")]
    UnknownMiddleware {
        name: String,
        module: String,
        action: String,
    },
    #[error("invalid exposure entry '{entry}' in module '{module}': {reason}")]
    InvalidDescriptor {
        module: String,
        entry: String,
        reason: String,
    },
    #[error("module '{module}' exposes '{action}' but has no such action")]
    MissingAction { module: String, action: String },
    #[error("module '{module}' declares {verb}={action} more than once")]
    DuplicateRoute {
        module: String,
        verb: Verb,
        action: String,
    },
    #[error("module '{0}' is registered twice")]
    DuplicateModule(String),
}

/// Request-time lookup failures. Both map to 404.
#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("Module '{0}' not found")]
    ModuleNotFound(String),
    #[error("Action '{action}' is not exposed for {verb} on module '{module}'")]
    ActionNotExposed {
        module: String,
        verb: Verb,
        action: String,
    },
}

/// One parsed exposure entry, e.g. `put=update|__auth|__isSuperAdmin|__params`
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    pub verb: Verb,
    pub action: String,
    pub middlewares: Vec<String>,
}

impl ActionDescriptor {
    pub fn parse(module: &str, entry: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidDescriptor {
            module: module.to_string(),
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = entry.split('|').map(str::trim);
        let head = segments.next().unwrap_or_default();
        let (verb, action) = head.split_once('=').ok_or_else(|| invalid("expected <verb>=<action>"))?;

        let verb = Verb::parse(verb).ok_or_else(|| invalid("unknown verb"))?;
        let action = action.trim();
        if action.is_empty() {
            return Err(invalid("missing action name"));
        }

        let middlewares = segments
            .map(|name| {
                if name.is_empty() {
                    Err(invalid("empty middleware name"))
                } else {
                    Ok(name.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !verb.has_body() && middlewares.iter().any(|m| m == keys::BODY) {
            return Err(invalid("__body on a verb without a body"));
        }

        Ok(Self {
            verb,
            action: action.to_string(),
            middlewares,
        })
    }

    /// `pre_stack ++ declared ++ [__body]` for body-carrying verbs
    pub fn chain(&self, pre_stack: &[String]) -> Vec<String> {
        let mut chain: Vec<String> = pre_stack.to_vec();
        chain.extend(self.middlewares.iter().filter(|m| m.as_str() != keys::BODY).cloned());
        if self.verb.has_body() {
            chain.push(keys::BODY.to_string());
        }
        chain
    }
}

/// A resolved `(module, verb, action)` with its middleware chain
#[derive(Clone)]
pub struct RouteEntry {
    pub module: String,
    pub verb: Verb,
    pub action: String,
    pub chain: Vec<String>,
    pub units: Vec<MiddlewareBox>,
    pub handler: ActionFn,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("module", &self.module)
            .field("verb", &self.verb)
            .field("action", &self.action)
            .field("chain", &self.chain)
            .finish()
    }
}

/// Immutable after [`RouteTable::build`]
#[derive(Debug, Default)]
pub struct RouteTable {
    modules: HashMap<String, HashMap<(Verb, String), RouteEntry>>,
}

impl RouteTable {
    pub fn build(
        managers: Vec<Arc<dyn Manager>>,
        registry: &MiddlewareRegistry,
        pre_stack: &[String],
    ) -> Result<Self, RegistryError> {
        let mut table = Self::default();
        for manager in managers {
            table.register(manager, registry, pre_stack)?;
        }
        Ok(table)
    }

    fn register(
        &mut self,
        manager: Arc<dyn Manager>,
        registry: &MiddlewareRegistry,
        pre_stack: &[String],
    ) -> Result<(), RegistryError> {
        let module = manager.name();
        if self.modules.contains_key(module) {
            return Err(RegistryError::DuplicateModule(module.to_string()));
        }

        let exposed = manager.http_exposed();
        let actions = manager.actions();
        let mut routes = HashMap::new();

        for entry in exposed {
            let descriptor = ActionDescriptor::parse(module, entry)?;
            let handler = actions.get(&descriptor.action).ok_or_else(|| RegistryError::MissingAction {
                module: module.to_string(),
                action: descriptor.action.clone(),
            })?;

            let chain = descriptor.chain(pre_stack);
            let units = chain
                .iter()
                .map(|name| {
                    registry.get(name).ok_or_else(|| RegistryError::UnknownMiddleware {
                        name: name.clone(),
                        module: module.to_string(),
                        action: descriptor.action.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let key = (descriptor.verb, descriptor.action.clone());
            if routes.contains_key(&key) {
                return Err(RegistryError::DuplicateRoute {
                    module: module.to_string(),
                    verb: descriptor.verb,
                    action: descriptor.action,
                });
            }

            tracing::debug!("Route {} {}:{} -> {:?}", descriptor.verb, module, descriptor.action, chain);
            routes.insert(
                key,
                RouteEntry {
                    module: module.to_string(),
                    verb: descriptor.verb,
                    action: descriptor.action,
                    chain,
                    units,
                    handler,
                },
            );
        }

        tracing::info!("Registered module '{}' with {} routes", module, routes.len());
        self.modules.insert(module.to_string(), routes);
        Ok(())
    }

    pub fn lookup(&self, module: &str, verb: Verb, action: &str) -> Result<&RouteEntry, RouteError> {
        let routes = self
            .modules
            .get(module)
            .ok_or_else(|| RouteError::ModuleNotFound(module.to_string()))?;

        routes
            .get(&(verb, action.to_string()))
            .ok_or_else(|| RouteError::ActionNotExposed {
                module: module.to_string(),
                verb,
                action: action.to_string(),
            })
    }

    pub fn route_count(&self) -> usize {
        self.modules.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, WidgetManager};

    fn pre_stack() -> Vec<String> {
        vec![keys::DEVICE.to_string()]
    }

    fn table_for(exposed: &'static [&'static str]) -> Result<RouteTable, RegistryError> {
        let registry = MiddlewareRegistry::load(&testing::injectable()).unwrap();
        RouteTable::build(vec![WidgetManager::with_exposure(exposed)], &registry, &pre_stack())
    }

    #[test]
    fn parses_verb_action_and_middlewares() {
        let descriptor = ActionDescriptor::parse("school", "put=update|__auth|__isSuperAdmin|__params").unwrap();
        assert_eq!(descriptor.verb, Verb::Put);
        assert_eq!(descriptor.action, "update");
        assert_eq!(descriptor.middlewares, vec!["__auth", "__isSuperAdmin", "__params"]);
    }

    #[test]
    fn rejects_malformed_entries() {
        for entry in [
            "getAll",
            "fetch=getAll",
            "get=",
            "get=getAll||__auth",
            "get=getAll|__body",
            "delete=delete|__params|__body",
        ] {
            let err = ActionDescriptor::parse("school", entry).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidDescriptor { .. }), "{}", entry);
        }
    }

    #[test]
    fn chain_order_appends_body_for_body_verbs() {
        let post = ActionDescriptor::parse("school", "post=create|__auth|__body|__isSuperAdmin").unwrap();
        assert_eq!(
            post.chain(&pre_stack()),
            vec!["__device", "__auth", "__isSuperAdmin", "__body"]
        );

        let get = ActionDescriptor::parse("school", "get=getAll|__auth").unwrap();
        assert_eq!(get.chain(&pre_stack()), vec!["__device", "__auth"]);
    }

    #[test]
    fn lookup_is_an_allow_list() {
        let table = table_for(&["get=getAll|__auth"]).unwrap();
        assert_eq!(table.route_count(), 1);
        assert!(table.lookup("widget", Verb::Get, "getAll").is_ok());

        // `secret` exists on the manager but is not exposed
        assert!(matches!(
            table.lookup("widget", Verb::Get, "secret"),
            Err(RouteError::ActionNotExposed { .. })
        ));
        assert!(matches!(
            table.lookup("widget", Verb::Post, "getAll"),
            Err(RouteError::ActionNotExposed { .. })
        ));
        assert!(matches!(
            table.lookup("gadget", Verb::Get, "getAll"),
            Err(RouteError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn load_fails_fast_on_bad_exposure() {
        assert!(matches!(
            table_for(&["get=getAll|__missing"]),
            Err(RegistryError::UnknownMiddleware { name, .. }) if name == "__missing"
        ));
        assert!(matches!(
            table_for(&["get=nothing"]),
            Err(RegistryError::MissingAction { .. })
        ));
        assert!(matches!(
            table_for(&["get=getAll", "get=getAll|__auth"]),
            Err(RegistryError::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn same_action_under_two_verbs_is_two_routes() {
        let table = table_for(&["get=getAll", "post=getAll"]).unwrap();
        assert_eq!(table.route_count(), 2);
        let post = table.lookup("widget", Verb::Post, "getAll").unwrap();
        assert_eq!(post.chain, vec!["__device", "__body"]);
    }
}
