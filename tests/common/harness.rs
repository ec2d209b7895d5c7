//! Test harness with testcontainers for integration testing.
//!
//! A single Postgres container and migration run are shared across all
//! tests in the binary for speed; each test gets its own `EngineDeps`
//! with a `MockClock`/`MockNotifier` so scheduling math is deterministic.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use queuedesk_core::config::Config;
use queuedesk_core::engine::QueueEngine;
use queuedesk_core::kernel::{EngineDeps, JwtIdentityService, MockClock, MockNotifier};
use queuedesk_core::store::Store;

struct SharedTestInfra {
    db_url: String,
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default().start().await.context("failed to start postgres container")?;

        let host = postgres.get_host().await?;
        let port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!("postgresql://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPool::connect(&db_url)
            .await
            .context("failed to connect to postgres for migrations")?;
        sqlx::migrate!("./migrations").run(&pool).await.context("failed to run migrations")?;

        Ok(Self { db_url, _postgres: postgres })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA.get_or_init(|| async { Self::init().await.expect("failed to start shared test infra") }).await
    }
}

/// Per-test harness: a fresh pool against the shared container, a
/// deterministic clock, and an in-memory notifier whose sent batches can
/// be inspected.
pub struct TestHarness {
    pub engine: QueueEngine,
    pub deps: EngineDeps,
    pub pool: PgPool,
    pub clock: Arc<MockClock>,
    pub notifier: Arc<MockNotifier>,
    pub identity: Arc<JwtIdentityService>,
}

impl TestHarness {
    pub fn clock(&self) -> &MockClock {
        &self.clock
    }

    pub fn advance(&self, minutes: i64) {
        self.clock.advance(minutes);
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[async_trait::async_trait]
impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        let infra = SharedTestInfra::get().await;
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&infra.db_url)
            .await
            .expect("failed to connect to test database");

        let store = Store::new(pool.clone());
        let clock = Arc::new(MockClock::at(Utc::now()));
        let notifier = Arc::new(MockNotifier::new());
        let identity = Arc::new(JwtIdentityService::new("test-secret", 3600));
        let config = Arc::new(Config {
            store_uri: infra.db_url.clone(),
            port: 0,
            notifier_url: String::new(),
            expo_access_token: None,
            session_secret: "test-secret".to_string(),
            token_ttl_seconds: 3600,
            undo_window_seconds: 300,
            restructure_horizon_seconds: 86_400,
            material_wait_delta_minutes: 5,
        });

        let deps = EngineDeps::new(store, clock.clone(), notifier.clone(), identity.clone(), config);
        let engine = QueueEngine::new(deps.clone());

        Self { engine, deps, pool, clock, notifier, identity }
    }
}
