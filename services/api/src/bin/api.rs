//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, FallbackClient, HttpTransport, MemoryNoteStore, OpenRouterStudyAdapter,
        PdfExtractAdapter, RetryPolicy,
    },
    config::Config,
    error::ApiError,
    web::{build_router, rest::ApiDoc, AppState},
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use study_notes_core::ports::DatabaseService;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Upper bound for a single completion round-trip.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let db: Arc<dyn DatabaseService> = match &config.database_url {
        Some(url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; notes are kept in memory only.");
            Arc::new(MemoryNoteStore::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let api_key = config
        .openrouter_api_key
        .clone()
        .ok_or_else(|| ApiError::Internal("OPENROUTER_API_KEY is required".to_string()))?;
    let http_client = reqwest::Client::builder()
        .timeout(PROVIDER_TIMEOUT)
        .build()?;
    let transport = HttpTransport::new(http_client, &config, api_key);
    let fallback_client = FallbackClient::new(transport, RetryPolicy::from_config(&config));
    let generator = Arc::new(OpenRouterStudyAdapter::new(
        fallback_client,
        config.initial_model(),
    ));
    info!(
        model = %config.initial_model(),
        fallbacks = config.fallback_models.len(),
        "AI provider configured."
    );

    // --- 4. Build the Shared AppState ---
    let bind_address = config.bind_address;
    let app_state = Arc::new(AppState::new(
        config,
        db,
        generator,
        Arc::new(PdfExtractAdapter),
    ));

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(build_router(app_state.clone())?)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    let shutdown = app_state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received.");
            shutdown.cancel();
        })
        .await?;

    // --- 7. Drain Background Generations ---
    app_state.tasks.close();
    info!(
        pending = app_state.tasks.len(),
        "Waiting for background generations to finish..."
    );
    app_state.tasks.wait().await;
    info!("Shutdown complete.");

    Ok(())
}
