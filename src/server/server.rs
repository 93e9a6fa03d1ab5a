//! HTTP server core

use actix_cors::Cors;
use actix_web::{App, HttpServer as ActixHttpServer, web};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

use crate::config::Config;
use crate::server::routes::{self, health};
use crate::server::state::AppState;
use crate::utils::error::{BridgeError, Result};

/// HTTP server wrapping the shared application state
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Build the registry, router, and shared state from configuration
    pub fn new(config: Config) -> Result<Self> {
        let state = AppState::new(config)?;

        if state.config.auth.access_keys.is_empty() {
            warn!("no access keys configured; all inbound requests will be rejected");
        }
        info!(
            providers = state.registry.len(),
            models = state.registry.model_ids().len(),
            "server initialized"
        );

        Ok(Self { state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind and run until shutdown
    pub async fn start(self) -> Result<()> {
        let server_config = self.state.config.server.clone();
        let bind_addr = format!("{}:{}", server_config.host, server_config.port);
        let state = web::Data::new(self.state);

        info!("starting http server on {bind_addr}");

        let server = ActixHttpServer::new(move || {
            let cors_config = &state.config.server.cors;
            let cors = if cors_config.enabled {
                if cors_config.allows_all_origins() {
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                } else {
                    let mut cors = Cors::default().allow_any_method().allow_any_header();
                    for origin in &cors_config.allowed_origins {
                        cors = cors.allowed_origin(origin);
                    }
                    cors
                }
            } else {
                Cors::default()
            };

            App::new()
                .app_data(state.clone())
                .wrap(cors)
                .wrap(TracingLogger::default())
                .route("/health", web::get().to(health::health_check))
                .configure(routes::configure)
        })
        .bind(&bind_addr)
        .map_err(|err| BridgeError::config(format!("failed to bind {bind_addr}: {err}")))?
        .run();

        server
            .await
            .map_err(|err| BridgeError::internal(format!("server error: {err}")))
    }
}
