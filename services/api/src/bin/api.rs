//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileStore, TokioDelay},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, session_handler},
        create_lead_handler, delete_lead_handler, due_today_handler, get_lead_handler,
        list_leads_handler,
        middleware::require_auth,
        rest::ApiDoc,
        state::AppState,
        update_lead_handler, update_status_handler,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use mockable::DefaultClock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open Storage ---
    info!("Opening data directory {}", config.data_dir.display());
    let store = Arc::new(FileStore::open(&config.data_dir)?);

    // --- 3. Build the Shared AppState & Restore the Session ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        store,
        Arc::new(DefaultClock),
        Arc::new(TokioDelay),
    ));
    let session = app_state.auth.hydrate()?;
    info!(authenticated = session.is_authenticated(), "Session hydrated");

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/session", get(session_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/leads", get(list_leads_handler).post(create_lead_handler))
        .route("/leads/due-today", get(due_today_handler))
        .route(
            "/leads/{id}",
            get(get_lead_handler)
                .patch(update_lead_handler)
                .delete(delete_lead_handler),
        )
        .route("/leads/{id}/status", patch(update_status_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
        signal_token.cancel();
    });

    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}
