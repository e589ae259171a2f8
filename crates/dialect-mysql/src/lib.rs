use async_trait::async_trait;
use scopedb_core::{AsyncBackend, AsyncEngine, Backend, ConnectionConfig, Engine, Result};

mod adapter;
mod sqlx_adapter;

pub const DIALECT: &str = "mysql";
pub const BLOCKING_DRIVERS: &[&str] = &["mysql", "pymysql"];
pub const ASYNC_DRIVERS: &[&str] = &["sqlx", "aiomysql", "asyncmy"];

#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlBackend;

impl Backend for MysqlBackend {
    fn name(&self) -> &'static str {
        "mysql"
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

#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlAsyncBackend;

#[async_trait]
impl AsyncBackend for MysqlAsyncBackend {
    fn name(&self) -> &'static str {
        "mysql-sqlx"
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
