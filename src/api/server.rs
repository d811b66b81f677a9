//! API server.
//!
//! Server setup, middleware stack, and graceful shutdown.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::LedgerConfig;
use crate::game::GameSessionEngine;
use crate::store::AccountStore;
use crate::token::SessionTokenCodec;
use crate::transfer::TransferCoordinator;
use crate::update::AccountUpdater;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

pub struct ApiServer {
    config: LedgerConfig,
    store: Arc<AccountStore>,
    codec: SessionTokenCodec,
}

impl ApiServer {
    pub fn new(config: LedgerConfig, store: Arc<AccountStore>, codec: SessionTokenCodec) -> Self {
        Self {
            config,
            store,
            codec,
        }
    }

    /// Start the API server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.get_socket_addr()?;

        info!("Starting ledger API server");
        info!("   Listen: http://{}", addr);
        self.log_server_info();

        let app = self.into_app();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped gracefully");
        Ok(())
    }

    /// Create the application with the full middleware stack
    fn into_app(self) -> axum::Router {
        let config = self.config;
        let retries = config.game.commit_retry_limit;
        let state = Arc::new(AppState {
            store: self.store.clone(),
            codec: self.codec,
            transfers: TransferCoordinator::new(self.store.clone(), retries),
            engine: GameSessionEngine::new(self.store.clone(), config.game.clone()),
            updater: AccountUpdater::new(self.store, retries),
            config: config.clone(),
        });

        create_router(state)
            // Request ID middleware (first for tracing)
            .layer(axum::middleware::from_fn(request_id_middleware))
            // CORS layer (before timeout to handle preflight)
            .layer(create_cors_layer(config.server.allowed_origins.clone()))
            // Timeout layer
            .layer(TimeoutLayer::new(config.request_timeout()))
            // Tracing layer (last for complete request tracing)
            .layer(TraceLayer::new_for_http())
    }

    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.server.host.parse::<std::net::IpAddr>()?,
            self.config.server.port,
        )))
    }

    fn log_server_info(&self) {
        info!("Server configuration:");
        info!("   Version: {}", env!("CARGO_PKG_VERSION"));
        info!("   CORS: {:?}", self.config.server.allowed_origins);
        info!(
            "   Request timeout: {}s",
            self.config.server.request_timeout_secs
        );
        info!("Available endpoints:");
        info!("   GET  /health            - Health check");
        info!("   POST /login             - Session login");
        info!("   GET  /status            - Balance snapshot");
        info!("   POST /signup/:role      - Account creation");
        info!("   GET  /accounts/:role    - Account listing");
        info!("   GET  /history           - Transfer ledger");
        info!("   POST /game/configure    - Game setup");
        info!("   POST /game/start        - Game start (debit)");
        info!("   POST /game/call         - Card-call event");
        info!("   GET  /games             - Game records");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
