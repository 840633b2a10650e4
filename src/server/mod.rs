use crate::classifier::Classifier;
use crate::config::Config;
use crate::emby::EmbyClient;
use crate::notify::{Notifier, TelegramClient};
use crate::state::{InFlight, NotifiedStore};
use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub mod routes_webhook;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub classifier: Arc<Classifier>,
    pub notifier: Arc<Notifier>,
    pub in_flight: Arc<InFlight>,
}

impl AppContext {
    /// Wire up the clients and classifier from a resolved config.
    pub fn build(config: &Config, store: Arc<NotifiedStore>) -> Self {
        let emby = Arc::new(EmbyClient::new(&config.emby_base_url, &config.emby_api_key));
        let telegram = TelegramClient::new(&config.telegram_bot_token, &config.telegram_chat_id);
        let notifier = Arc::new(Notifier::new(telegram, emby.clone()));
        let classifier = Arc::new(Classifier::new(config, emby, notifier.clone(), store));

        Self {
            classifier,
            notifier,
            in_flight: Arc::new(InFlight::default()),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(routes_webhook::handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config, store: Arc<NotifiedStore>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::build(&config, store);
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
