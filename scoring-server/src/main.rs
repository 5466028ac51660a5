//! FraudGuard Scoring Server
//!
//! Stateless HTTP service wrapping the pre-trained fraud classifier.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 FRAUDGUARD SCORING                   │
//! ├──────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌────────────┐   ┌───────────────┐  │
//! │  │  Router   │──▶│  Record    │──▶│  Classifier   │  │
//! │  │  (Axum)   │   │ validation │   │ (loaded once) │  │
//! │  └───────────┘   └────────────┘   └───────────────┘  │
//! └──────────────────────────────────────────────────────┘
//!        ▲
//!        │ POST /predict
//!   journal watcher / dashboard
//! ```

mod classifier;
mod config;
mod error;
mod handlers;
mod models;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    init_logging(&config);

    tracing::info!("FraudGuard Scoring Server starting...");
    tracing::info!("Model artifact: {}", config.model_path.display());

    // No model, no service
    let (classifier, model) = classifier::load(&config.model_path)
        .with_context(|| format!("failed to load classifier from {}", config.model_path.display()))?;

    tracing::info!("Classifier loaded: {} (sha256 {})", model.kind, model.fingerprint);

    let state = AppState {
        classifier,
        model,
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_logging(config: &config::Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fraudguard_scoring=debug,tower_http=debug".into());

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn classifier::Classifier>,
    pub model: classifier::ModelInfo,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home::index))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any)
                ),
        )
        .with_state(state)
}
