use std::net::SocketAddr;
use std::sync::Arc;

use garage_db::memory::MemoryStore;
use garage_db::pg::PgStore;
use garage_db::store::{CredentialStore, RefreshTokenStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use garage_api::auth::password::PasswordHasher;
use garage_api::config::ServerConfig;
use garage_api::router::build_app_router;
use garage_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "garage_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        access_ttl_ms = config.jwt.access_token_ttl_ms,
        refresh_ttl_ms = config.jwt.refresh_token_ttl_ms,
        "Loaded server configuration"
    );

    // --- Storage ---
    let (credentials, refresh_tokens) = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = garage_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            garage_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            garage_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store = Arc::new(PgStore::new(pool));
            (store.clone() as Arc<dyn CredentialStore>, store as Arc<dyn RefreshTokenStore>)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn CredentialStore>, store as Arc<dyn RefreshTokenStore>)
        }
    };

    // --- App state ---
    let state = AppState::new(
        config.clone(),
        credentials,
        refresh_tokens,
        PasswordHasher::default(),
    );

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
