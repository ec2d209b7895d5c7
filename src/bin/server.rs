//! queuedesk-server — the HTTP/JSON API process (spec §6 "Transport").

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use queuedesk_core::kernel::{EngineDeps, ExpoNotifier, JwtIdentityService, SystemClock};
use queuedesk_core::store::Store;
use queuedesk_core::{server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,queuedesk_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true).with_line_number(true))
        .init();

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "starting queuedesk server");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.store_uri)
        .await
        .context("failed to connect to store")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let store = Store::new(pool);
    let clock = Arc::new(SystemClock);
    let notifier = Arc::new(ExpoNotifier::new(
        config.notifier_url.clone(),
        config.expo_access_token.clone(),
    ));
    let identity = Arc::new(JwtIdentityService::new(&config.session_secret, config.token_ttl_seconds));
    let config = Arc::new(config);

    let deps = EngineDeps::new(store, clock, notifier, identity, config.clone());
    let app = server::build_app(deps);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
