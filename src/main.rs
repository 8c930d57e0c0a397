//! Application entry point and server initialization
//!
//! Loads configuration, opens the database and serves the HTTP API until
//! SIGINT or SIGTERM arrives.

use std::env;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use formboard::config::Config;
use formboard::database::{init_db, AppState};
use formboard::route::create_app;

const DEFAULT_LOG_FILTER: &str = "formboard=debug,tower_http=debug";

/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "data.db")
/// - `AUTHORIZATION` - Shared secret expected from the identity proxy (default: unset)
/// - `LOCATION_HEADER` - Header carrying the visitor location (default: "x-visitor-location")
/// - `RUST_LOG` / `LOG_FILTER` - Log filter (default: "formboard=debug,tower_http=debug")
#[tokio::main]
async fn main() {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(env::var("LOG_FILTER").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load();
    let port = config.port;

    let db = init_db(&config.database_url).expect("Failed to initialize database");
    info!(database = %config.database_url, "database ready");

    let state = AppState::new(db, config);
    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind address");
    info!("Server running at http://localhost:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolves on Ctrl+C (SIGINT) or, on Unix, SIGTERM
///
/// In-flight requests finish and open redb transactions close before the
/// process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
