use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use nova_core::config::GatewayConfig;
use nova_graph::StreamMerger;
use nova_storage::Database;

use crate::routes;
use crate::state::AppState;

/// HTTP + SSE gateway server built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    merger: Arc<StreamMerger>,
    db: Database,
    environment: String,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        merger: Arc<StreamMerger>,
        db: Database,
        environment: String,
    ) -> Self {
        Self {
            config,
            merger,
            db,
            environment,
        }
    }

    /// Serve until the shutdown token fires.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = Arc::new(AppState {
            merger: self.merger.clone(),
            db: self.db.clone(),
            environment: self.environment.clone(),
        });

        let app = Router::new()
            .route("/health", get(routes::health))
            .route("/health/ready", get(routes::ready))
            .route("/api/v1/chat", post(routes::chat))
            .route("/api/v1/chat/stream", post(routes::chat_stream))
            .layer(CorsLayer::permissive())
            .with_state(state);

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway accepting connections");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway stopped");
        Ok(())
    }
}
