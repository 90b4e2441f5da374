//! LabTrack Server - Laboratory Equipment Management
//!
//! REST API server for equipment lending and maintenance tracking.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use labtrack_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{reminders::ReminderTask, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("labtrack_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting LabTrack Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(
        repository.clone(),
        config.auth.clone(),
        config.email.clone(),
    )
    .await
    .expect("Failed to create services");
    let services = Arc::new(services);

    // First-run bootstrap
    services
        .users
        .ensure_default_admin()
        .await
        .expect("Failed to bootstrap admin account");

    // Background sweep: status reconciliation plus maintenance and
    // overdue reminders
    let reminders = ReminderTask::new(
        repository,
        services.clone(),
        config.reminders.clone(),
    );
    tokio::spawn(reminders.run());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Equipment
        .route("/equipment", get(api::equipment::list_equipment))
        .route("/equipment", post(api::equipment::create_equipment))
        .route("/equipment/reconcile", post(api::equipment::reconcile_equipment))
        .route("/equipment/:id", get(api::equipment::get_equipment))
        .route("/equipment/:id", put(api::equipment::update_equipment))
        .route("/equipment/:id/status", put(api::equipment::change_equipment_status))
        .route("/equipment/:id/maintenance", get(api::equipment::equipment_maintenance))
        // Borrow requests
        .route("/borrows", post(api::borrows::create_borrow))
        .route("/borrows", get(api::borrows::list_my_borrows))
        .route("/borrows/pending", get(api::borrows::pending_borrows))
        .route("/borrows/:id/decision", post(api::borrows::decide_borrow))
        .route("/borrows/:id/return", post(api::borrows::create_return))
        // Return requests
        .route("/returns/pending", get(api::returns::pending_returns))
        .route("/returns/:id/decision", post(api::returns::decide_return))
        // Users
        .route("/users", get(api::users::list_users))
        .route("/users", post(api::users::create_user))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id", put(api::users::update_user))
        // Notifications
        .route("/notifications", get(api::notifications::list_notifications))
        .route("/notifications/unread-count", get(api::notifications::unread_count))
        .route("/notifications/:id", delete(api::notifications::delete_notification))
        // Maintenance
        .route("/maintenance", get(api::maintenance::list_plans))
        .route("/maintenance", post(api::maintenance::create_plan))
        .route("/maintenance/:id", get(api::maintenance::get_plan))
        .route("/maintenance/:id", put(api::maintenance::update_plan))
        .route("/maintenance/:id", delete(api::maintenance::delete_plan))
        // Reports
        .route("/reports/equipment-status", get(api::reports::equipment_status_report))
        .route("/reports/maintenance-due", get(api::reports::maintenance_due_report))
        .route("/reports/overdue", get(api::reports::overdue_report))
        .route("/reports/usage", get(api::reports::usage_report))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
