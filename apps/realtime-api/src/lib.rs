pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;

use std::sync::Arc;

use config::Config;
use gateway::registry::ConnectionRegistry;

/// Shared application state available to all route handlers.
///
/// `connections` is the one registry for the process. In-process REST
/// handlers push through it after they mutate domain state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            connections: Arc::new(ConnectionRegistry::new()),
        }
    }
}
