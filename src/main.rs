use chat_history_search::{
    api::{build_router, AppState},
    config::Config,
    search::{ElasticsearchClient, HealthChecker, IndexManager, SearchService},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize tracing
    let json_logs = config.observability.json_logs;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "chat_history_search={},tower_http=info",
                    config.observability.log_level
                )
                .into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    config.search.validate()?;

    tracing::info!(
        service = %config.observability.service_name,
        "Starting chat history search v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = chat_history_search::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Connect to the document store
    let store = Arc::new(ElasticsearchClient::new(&config.elasticsearch)?);
    tracing::info!(url = %store.base_url(), "Document store client initialized");

    let health = HealthChecker::new(store.clone());
    let report = health.check().await;
    match &report.error {
        Some(error) => tracing::warn!(status = %report.status, %error, "Document store is not reachable"),
        None => tracing::info!(status = %report.status, "Document store reachable"),
    }

    // Create indices that do not exist yet
    let indices = IndexManager::new(store.clone(), config.elasticsearch.index.clone());
    if let Err(e) = indices.initialize().await {
        tracing::warn!("Failed to initialize indices: {}", e);
    }

    let search = Arc::new(SearchService::new(
        store,
        config.elasticsearch.index.conversations.clone(),
        config.search.clone(),
    ));

    let app_state = AppState::new(search).with_health(health);
    let app = build_router(app_state).layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )));

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Search API: http://{}/api/v1/search", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
