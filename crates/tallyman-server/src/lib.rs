//! Tallyman Server
//!
//! HTTP service wrapping the extraction pipeline: an extraction endpoint for
//! the consumption hook, and a webhook receiver that correlates document
//! notifications with stored predictions.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod retention;

use config::{ConfigError, ServerConfig};
use handlers::{create_router, AppState};
use retention::RetentionWorker;
use std::sync::Arc;
use tallyman_domain::ReceiptFields;
use tallyman_extractor::Extractor;
use tallyman_llm::{LlmError, ModelHandle, OllamaProvider};
use tallyman_paperless::{resolve_field_ids, ApiError, FieldResolveError, PaperlessClient};
use tallyman_store::FilePredictionStore;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Document API client could not be built
    #[error("Document API error: {0}")]
    Api(#[from] ApiError),

    /// Custom fields could not be resolved
    #[error("Field resolution failed: {0}")]
    Fields(#[from] FieldResolveError),

    /// Model could not be loaded
    #[error("Model load failed: {0}")]
    Model(#[from] LlmError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Start the HTTP server
///
/// Startup is ordered so that nothing is served unless every dependency is
/// ready: config validation, field resolution, model load, store, then bind.
/// Runs until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    info!("Starting Tallyman server");
    info!("Bind address: {}", config.bind_addr());
    info!("Document API: {}", config.paperless.url);
    info!("Model: {} at {}", config.llm.model, config.llm.endpoint);

    // Field IDs
    let documents = Arc::new(PaperlessClient::new(&config.paperless)?);
    let names = config.fields.names();
    let field_ids =
        resolve_field_ids(documents.as_ref(), &names, config.fields.retry_policy()).await?;
    let fields = ReceiptFields::from_map(&field_ids, &config.fields.amount, &config.fields.purchase_date)
        .ok_or_else(|| ServerError::Server("resolved field map is incomplete".to_string()))?;

    // Model
    let provider = OllamaProvider::with_timeout(
        config.llm.endpoint.clone(),
        config.llm.model.clone(),
        config.llm.timeout_secs,
    )?
    .with_threads(config.llm.threads)
    .with_context_window(config.llm.context_window);
    let model = tokio::task::spawn_blocking(move || ModelHandle::load(provider))
        .await
        .map_err(|e| ServerError::Server(format!("Model load task failed: {}", e)))??;
    let extractor = Arc::new(Extractor::new(model, config.llm.extractor_config()));

    // Prediction cache
    let store = Arc::new(FilePredictionStore::new(&config.store.dir));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let retention = match config.store.max_age() {
        Some(max_age) => Some(tokio::spawn(
            RetentionWorker::new(Arc::clone(&store), max_age).run(shutdown_rx),
        )),
        None => {
            warn!(
                dir = %config.store.dir.display(),
                "store.max_age_secs is not set; prediction records are never pruned"
            );
            None
        }
    };

    let state = AppState {
        extractor,
        store,
        documents,
        fields,
    };
    let app = create_router(state);

    // Bind and serve
    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()));

    let _ = shutdown_tx.send(true);
    if let Some(task) = retention {
        let _ = task.await;
    }

    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
