use std::sync::Arc;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenManager;
use crate::config::AppConfig;
use crate::database::Store;
use crate::dispatch::{self, Dispatcher};
use crate::managers::{
    AuthManager, ClassroomManager, Manager, SchoolManager, SeedManager, StudentManager, UserManager,
};
use crate::middleware::{Injectable, MiddlewareRegistry};
use crate::routing::{RegistryError, RouteTable};
use crate::stack::VirtualStack;
use crate::validation::ValidatorRegistry;

/// Everything the service needs, built once at startup
pub struct App {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub dispatcher: Arc<Dispatcher>,
}

impl App {
    /// Wire registries, managers and routes. Fails on any unresolved route.
    pub fn load(config: AppConfig) -> Result<Self, RegistryError> {
        let config = Arc::new(config);
        let store = Arc::new(Store::new());
        let tokens = Arc::new(TokenManager::from_config(&config));
        let validators = Arc::new(ValidatorRegistry::standard());

        let injectable = Injectable {
            config: config.clone(),
            tokens: tokens.clone(),
            validators,
        };
        let registry = MiddlewareRegistry::load(&injectable)?;

        let managers: Vec<Arc<dyn Manager>> = vec![
            AuthManager::new(store.clone(), tokens),
            SeedManager::new(store.clone(), config.clone()),
            SchoolManager::new(store.clone()),
            UserManager::new(store.clone()),
            ClassroomManager::new(store.clone()),
            StudentManager::new(store.clone()),
        ];
        let routes = RouteTable::build(managers, &registry, &config.stack.pre_stack)?;
        tracing::info!("Route table ready with {} routes", routes.route_count());

        let stack = VirtualStack::new(config.stack.middleware_timeout());
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(routes), stack));

        Ok(Self {
            config,
            store,
            dispatcher,
        })
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/ping", get(ping))
            .route("/api/:module/:action", any(dispatch::handle))
            .route("/api/:module/:action/:id", any(dispatch::handle))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.dispatcher.clone())
    }
}

async fn ping() -> &'static str {
    "Pong"
}
