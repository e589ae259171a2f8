use async_trait::async_trait;
use scopedb_core::{AsyncBackend, AsyncEngine, Backend, ConnectionConfig, Engine, Result};

mod adapter;
mod sqlx_adapter;

pub const DIALECT: &str = "postgresql";
/// Drivers served by [`PostgresBackend`].
pub const BLOCKING_DRIVERS: &[&str] = &["postgres", "psycopg2"];
/// Drivers served by [`PostgresAsyncBackend`].
pub const ASYNC_DRIVERS: &[&str] = &["sqlx", "asyncpg"];

/// Blocking PostgreSQL backend on the `postgres` client.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresBackend;

impl Backend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn dialect(&self) -> &'static str {
        DIALECT
    }

    fn drivers(&self) -> &'static [&'static str] {
        BLOCKING_DRIVERS
    }

    fn create_engine(&self, config: &ConnectionConfig) -> Result<Box<dyn Engine>> {
        adapter::create_engine(config)
    }
}

/// Suspending PostgreSQL backend on a lazily connecting `sqlx` pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresAsyncBackend;

#[async_trait]
impl AsyncBackend for PostgresAsyncBackend {
    fn name(&self) -> &'static str {
        "postgres-sqlx"
    }

    fn dialect(&self) -> &'static str {
        DIALECT
    }

    fn drivers(&self) -> &'static [&'static str] {
        ASYNC_DRIVERS
    }

    async fn create_engine(&self, config: &ConnectionConfig) -> Result<Box<dyn AsyncEngine>> {
        sqlx_adapter::create_engine(config)
    }
}
