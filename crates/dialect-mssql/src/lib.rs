use async_trait::async_trait;
use scopedb_core::{AsyncBackend, AsyncEngine, ConnectionConfig, Result};

mod adapter;

pub const DIALECT: &str = "mssql";
pub const DRIVERS: &[&str] = &["tiberius", "aioodbc"];

/// Suspending SQL Server backend on `tiberius`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MssqlAsyncBackend;

#[async_trait]
impl AsyncBackend for MssqlAsyncBackend {
    fn name(&self) -> &'static str {
        "mssql-tiberius"
    }

    fn dialect(&self) -> &'static str {
        DIALECT
    }

    fn drivers(&self) -> &'static [&'static str] {
        DRIVERS
    }

    async fn create_engine(&self, config: &ConnectionConfig) -> Result<Box<dyn AsyncEngine>> {
        Ok(adapter::create_engine(config))
    }
}
