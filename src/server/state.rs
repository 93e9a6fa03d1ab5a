//! Application state shared across HTTP handlers

use std::sync::Arc;

use crate::config::Config;
use crate::core::registry::ProviderRegistry;
use crate::core::router::Router;
use crate::utils::error::Result;

/// Shared, read-only server state
///
/// Everything here is constructed once at startup; request handlers only
/// ever read it, so plain `Arc` sharing is enough.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ProviderRegistry>,
    pub router: Arc<Router>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let registry = Arc::new(ProviderRegistry::from_config(&config.providers)?);
        let router = Arc::new(Router::new(Arc::clone(&registry), &config.proxy)?);
        Ok(Self {
            config: Arc::new(config),
            registry,
            router,
        })
    }
}
