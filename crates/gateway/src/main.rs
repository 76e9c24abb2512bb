//! FuelForge Gateway
//!
//! The HTTP front end for invoice reconciliation.
//! Handles:
//! - PDF uploads and per-browser sessions
//! - Running the batch processor and rendering the sheets
//! - Combined CSV download
//! - Observability (logging, metrics, health checks)

mod handlers;
mod middleware;
mod session;
mod views;

#[cfg(test)]
mod test_support;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::get,
    Router,
};
use fuelforge_common::{
    config::AppConfig,
    logging,
    metrics::{self, PROCESSING_BUCKETS},
    MemorySessionStore, RedisSessionStore, SessionStore,
};
use fuelforge_ingestion::{BatchProcessor, OcrEngine, TesseractCli};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimit};
use crate::session::SessionState;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionStore<SessionState>>,
    pub processor: BatchProcessor,
    pub ocr: Option<Arc<dyn OcrEngine>>,
    pub metrics: Option<PrometheusHandle>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    // Initialize tracing
    logging::init_logging(&config)?;
    info!("Starting FuelForge gateway v{}", fuelforge_common::VERSION);

    prepare_directories(&config)?;

    // Initialize metrics
    let prometheus = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("fuelforge_processing_duration_seconds".to_string()),
            PROCESSING_BUCKETS,
        )?
        .install_recorder()?;
    metrics::register_metrics();

    let sessions = session_store(&config).await?;

    let ocr: Option<Arc<dyn OcrEngine>> = if config.ocr.enabled {
        let engine = TesseractCli::new(&config.ocr.tesseract_cmd, &config.ocr.language);
        if !engine.is_available() {
            warn!(
                command = %config.ocr.tesseract_cmd,
                "Tesseract not found, scanned PDFs will be skipped"
            );
        }
        Some(Arc::new(engine))
    } else {
        None
    };

    let config = Arc::new(config);

    // Create app state
    let state = AppState {
        config: config.clone(),
        sessions,
        processor: BatchProcessor::new(config.invoice.clone(), ocr.clone()),
        ocr,
        metrics: Some(prometheus),
    };

    spawn_upload_sweeper(
        state.sessions.clone(),
        config.storage.uploads_dir.clone(),
        config.request_timeout(),
    );

    // Build the router
    let app = create_router(state);

    // Start the server
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the uploads, knowledge and logs directories
fn prepare_directories(config: &AppConfig) -> std::io::Result<()> {
    for dir in [
        &config.storage.uploads_dir,
        &config.storage.knowledge_dir,
        &config.storage.logs_dir,
    ] {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Pick the session backend: Redis when configured, otherwise in memory
async fn session_store(
    config: &AppConfig,
) -> fuelforge_common::Result<Arc<dyn SessionStore<SessionState>>> {
    if let Some(url) = &config.session.redis_url {
        info!("Connecting to Redis session store...");
        let store = RedisSessionStore::<SessionState>::connect(
            url,
            &config.session.key_prefix,
            config.session.ttl_secs,
        )
        .await?;
        return Ok(Arc::new(store) as Arc<dyn SessionStore<SessionState>>);
    }

    let store = Arc::new(MemorySessionStore::<SessionState>::new(config.session_ttl()));
    let sweeper = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sweeper.purge_expired().await;
        }
    });
    Ok(store as Arc<dyn SessionStore<SessionState>>)
}

/// Periodically delete upload directories whose session has expired
fn spawn_upload_sweeper(
    sessions: Arc<dyn SessionStore<SessionState>>,
    uploads_dir: PathBuf,
    grace: Duration,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            match session::sweep_orphaned_uploads(&uploads_dir, sessions.as_ref(), grace).await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Removed orphaned upload directories"),
                Err(e) => warn!(error = %e, "Upload sweep failed"),
            }
        }
    });
}

/// Create the main application router
pub(crate) fn create_router(state: AppState) -> Router {
    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut routes = Router::new()
        // Pages
        .route(
            "/",
            get(handlers::pages::index).post(handlers::upload::upload_files),
        )
        .route("/process_files", get(handlers::results::process_files))
        .route(
            "/download_combined_csv",
            get(handlers::results::download_combined_csv),
        )
        .route("/deployment", get(handlers::pages::deployment))
        // Health
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes));

    if state.config.rate_limit.enabled {
        let limit = RateLimit::new(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        routes = routes.layer(axum::middleware::from_fn_with_state(
            limit,
            rate_limit_middleware,
        ));
    }

    // Compose the app
    routes
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
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
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
