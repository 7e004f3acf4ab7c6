//! Test harness with testcontainers for the store query tests.
//!
//! A single MySQL container is shared across tests and seeded with the two
//! tables the entitlement queries read.

use anyhow::{Context, Result};
use sqlx::MySqlPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mysql::Mysql;
use tokio::sync::OnceCell;

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        username VARCHAR(32) NOT NULL,
        privileges INT NOT NULL DEFAULT 0
    )",
    "CREATE TABLE discord_oauth (
        user_id INT NOT NULL PRIMARY KEY,
        discord_id BIGINT NOT NULL UNIQUE
    )",
];

struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _mysql: ContainerAsync<Mysql>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let mysql = Mysql::default()
            .start()
            .await
            .context("Failed to start MySQL container")?;

        let host = mysql.get_host().await?;
        let port = mysql.get_host_port_ipv4(3306).await?;
        let db_url = format!("mysql://root@{}:{}/test", host, port);

        let pool = MySqlPool::connect(&db_url)
            .await
            .context("Failed to connect to MySQL for schema setup")?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self {
            db_url,
            _mysql: mysql,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Test harness handing each test a pool on the shared database.
///
/// Tests run concurrently against the same tables, so each test must use its
/// own Discord ids and only assert on rows it inserted.
pub struct TestHarness {
    pub db_pool: MySqlPool,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;
        let db_pool = MySqlPool::connect(&infra.db_url).await?;
        Ok(Self { db_pool })
    }

    /// Insert a user, optionally linked to a Discord account
    pub async fn insert_user(
        &self,
        username: &str,
        privileges: i32,
        discord_id: Option<i64>,
    ) -> Result<i32> {
        let result = sqlx::query("INSERT INTO users (username, privileges) VALUES (?, ?)")
            .bind(username)
            .bind(privileges)
            .execute(&self.db_pool)
            .await?;
        let id = result.last_insert_id() as i32;

        if let Some(discord_id) = discord_id {
            sqlx::query("INSERT INTO discord_oauth (user_id, discord_id) VALUES (?, ?)")
                .bind(id)
                .bind(discord_id)
                .execute(&self.db_pool)
                .await?;
        }

        Ok(id)
    }
}
