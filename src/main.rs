//! chat-relay server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints. Storage
//! and bus backends are selected from the environment: `DATABASE_URL`
//! picks PostgreSQL over the in-memory store, `REDIS_URL` picks the
//! cross-instance Redis bus over the in-process one.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chat_relay::api;
use chat_relay::app_state::AppState;
use chat_relay::bus::{BroadcastBus, MemoryBus, RedisBus};
use chat_relay::config::RelayConfig;
use chat_relay::persistence::{ConversationStore, MemoryStore, PostgresStore};
use chat_relay::service::ChatService;
use chat_relay::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RelayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting chat-relay");

    // Select the persistence backend
    let store: Arc<dyn ConversationStore> = if let Some(database_url) = &config.database_url {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("connected to PostgreSQL store");
        Arc::new(PostgresStore::new(pool))
    } else {
        tracing::warn!("DATABASE_URL not set; using in-memory store");
        Arc::new(MemoryStore::new())
    };

    // Select the broadcast bus backend
    let bus: Arc<dyn BroadcastBus> = if let Some(redis_url) = &config.redis_url {
        Arc::new(RedisBus::connect(redis_url, config.bus_capacity).await?)
    } else {
        tracing::warn!("REDIS_URL not set; using in-process bus (single instance only)");
        Arc::new(MemoryBus::new(config.bus_capacity))
    };

    // Build service layer and application state
    let chat_service = Arc::new(ChatService::new(store, bus));
    let shutdown = CancellationToken::new();
    let app_state = AppState {
        chat_service,
        config: Arc::new(config.clone()),
        shutdown: shutdown.clone(),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/api/chat/conversations/{id}/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .with_state(app_state);

    #[cfg(feature = "swagger-ui")]
    let app = app.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(
            "/api-docs/openapi.json",
            <api::ApiDoc as utoipa::OpenApi>::openapi(),
        ),
    );

    // Start server with graceful shutdown: SIGINT cancels the server-wide
    // token, which tears down every open connection session.
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("chat-relay stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
    shutdown.cancel();
}
