//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, gen_llm::OpenAiGatewayAdapter, payment::ChapaAdapter},
    config::Config,
    error::ApiError,
    web::{
        account_handler,
        auth::{login_handler, logout_handler, signup_handler},
        chat_handler, generate_explanation_handler, generate_flashcards_handler,
        generate_quiz_handler, generate_summary_handler, initialize_payment_handler,
        middleware::require_auth,
        rest::ApiDoc,
        state::AppState,
        uploads_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
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

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let ai_adapter = Arc::new(OpenAiGatewayAdapter::new(
        config.openai_api_key.as_deref(),
        config.gen_model.clone(),
        config.chat_model.clone(),
    ));

    let payment_adapter = Arc::new(ChapaAdapter::new(
        config.chapa_secret_key.clone(),
        config.chapa_api_url.clone(),
        format!("{}/dashboard/account", config.app_url),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        db_adapter,
        ai_adapter,
        payment_adapter,
        config.clone(),
    ));

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {e}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/generate/summary", post(generate_summary_handler))
        .route("/generate/explanation", post(generate_explanation_handler))
        .route("/generate/flashcards", post(generate_flashcards_handler))
        .route("/generate/quiz", post(generate_quiz_handler))
        .route("/chat", post(chat_handler))
        .route("/uploads", post(uploads_handler))
        .route("/account", get(account_handler))
        .route("/payments/initialize", post(initialize_payment_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes. The body limit leaves headroom over the 50MB
    // per-file cap so a small batch of large files still fits.
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(120 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
