//! # Gatehouse API Server
//!
//! Multi-tenant role-based access control over HTTP: users, organizations,
//! resources, permissions, roles and the grants between them, plus plans,
//! subscriptions and typed property sets.
//!
//! ## Boot sequence
//!
//! 1. Read boot parameters (`GATEHOUSE_ENV`, `GATEHOUSE_HOME`, `GATEHOUSE_MIGRATION`)
//! 2. Load layered configuration and initialize logging
//! 3. Connect to PostgreSQL and apply the requested migration mode
//! 4. Load JWT keys and serve until Ctrl+C
//!
//! ## Usage
//!
//! ```bash
//! GATEHOUSE__DATABASE__URL=postgresql://localhost/gatehouse \
//! GATEHOUSE__JWT__SECRET=$(openssl rand -hex 32) \
//! GATEHOUSE_MIGRATION=m \
//! cargo run -p gatehouse-api
//! ```

use std::{fs::OpenOptions, net::SocketAddr, sync::Arc};

use anyhow::Context;
use gatehouse_api::{
    app::{build_router_with_public, AppState},
    config::{BootParams, Config, LogConfig},
};
use gatehouse_shared::db::{
    migrations::{self, MigrationMode},
    pool::{close_pool, create_pool},
};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let boot = BootParams::from_env()?;
    let config = Config::load(&boot)?;
    init_tracing(&config.log, &boot)?;

    tracing::info!(
        env = %boot.env,
        home = %boot.app_home.display(),
        "Gatehouse API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(&config.database)
        .await
        .context("connecting to the database")?;

    migrations::apply(&pool, boot.migration)
        .await
        .with_context(|| format!("applying migrations ({})", boot.migration))?;

    if boot.migration == MigrationMode::Rollback {
        tracing::info!("Rollback complete, not serving");
        close_pool(pool).await;
        return Ok(());
    }

    let keys = config.jwt.load_keys(&boot)?;

    let public_dir = config.dirs.public_dir(&boot);
    let public_dir = if public_dir.is_dir() {
        tracing::info!(dir = %public_dir.display(), autoreload = config.autoreload, "Serving static files");
        Some(public_dir)
    } else {
        None
    };

    let address = config.bind_address();
    let app = build_router_with_public(AppState::new(pool.clone(), config, keys), public_dir);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving HTTP")?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Installs the global subscriber
///
/// `RUST_LOG` wins over `log.level`. With `log.file` set, output is appended
/// to that file (relative to the application home) without ANSI colors.
fn init_tracing(log: &LogConfig, boot: &BootParams) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.level)
            .with_context(|| format!("invalid log.level '{}'", log.level))?,
    };

    let output: Box<dyn Layer<Registry> + Send + Sync> = match &log.file {
        Some(path) => {
            let path = boot.resolve(path);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let layer = fmt::layer().with_ansi(false).with_writer(Arc::new(file));

            if log.json {
                layer.json().boxed()
            } else {
                layer.boxed()
            }
        }
        None if log.json => fmt::layer().json().boxed(),
        None => fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
