//! # lms-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the LMS API.
//! Binds to configurable port (default 8080).

use anyhow::Context;
use lms_api::state::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    tracing::info!(?config, "starting LMS API");
    let port = config.port;

    // Absent DATABASE_URL means in-memory only.
    let db_pool = lms_api::db::init_pool(config.database_url.as_deref())
        .await
        .context("database initialization failed")?;

    let state = lms_api::bootstrap::bootstrap(config, db_pool).context("bootstrap failed")?;

    state
        .hydrate_from_db()
        .await
        .context("database hydration failed")?;

    let app = lms_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("LMS API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` filter (default `info`); JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
