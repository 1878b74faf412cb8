//! Shared Postgres-backed test harness: one container for the whole test
//! binary, migrations run once on first use.

use std::sync::Arc;

use anyhow::{Context, Result};
use scheduler_core::store::postgres::PgStore;
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct SharedInfra {
    db_url: String,
    _container: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedInfra> = OnceCell::const_new();

impl SharedInfra {
    async fn init() -> Result<Self> {
        let container = Postgres::default()
            .start()
            .await
            .context("failed to start postgres container")?;
        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;
        let db_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPool::connect(&db_url)
            .await
            .context("failed to connect for migrations")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        pool.close().await;

        Ok(Self {
            db_url,
            _container: container,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async { Self::init().await.expect("failed to start shared infra") })
            .await
    }
}

/// Per-test handle: a fresh connection pool against the shared container, a
/// truncate between tests instead of a fresh container each time.
pub struct TestHarness {
    pub store: Arc<PgStore>,
    pool: PgPool,
}

impl TestHarness {
    pub fn store(&self) -> Arc<PgStore> {
        self.store.clone()
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn seed_environment(&self, env: &scheduler_core::domain::Environment) {
        sqlx::query(
            "INSERT INTO environments (id, name, admin_emp_codes, interpreter_emp_codes, department_centers, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(env.id)
        .bind(&env.name)
        .bind(&env.admin_emp_codes)
        .bind(&env.interpreter_emp_codes)
        .bind(&env.department_centers)
        .bind(env.created_at)
        .bind(env.updated_at)
        .execute(&self.pool)
        .await
        .expect("failed to seed environment");
    }

    pub async fn seed_interpreter(&self, interp: &scheduler_core::domain::Interpreter) {
        sqlx::query(
            "INSERT INTO interpreters (id, emp_code, display_name, is_active, languages, environment_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(interp.id)
        .bind(&interp.emp_code)
        .bind(&interp.display_name)
        .bind(interp.is_active)
        .bind(&interp.languages)
        .bind(interp.environment_id)
        .bind(interp.created_at)
        .bind(interp.updated_at)
        .execute(&self.pool)
        .await
        .expect("failed to seed interpreter");
    }

    async fn truncate_all(&self) {
        sqlx::query(
            "TRUNCATE assignment_decision_logs, bookings, interpreters, environments CASCADE",
        )
        .execute(&self.pool)
        .await
        .expect("truncate failed");
    }
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        let infra = SharedInfra::get().await;
        let pool = PgPool::connect(&infra.db_url)
            .await
            .expect("failed to connect to test database");
        let store = Arc::new(PgStore::new(pool.clone()));
        let harness = Self { store, pool };
        harness.truncate_all().await;
        harness
    }
}
