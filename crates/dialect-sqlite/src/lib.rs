use scopedb_core::{Backend, ConnectionConfig, Engine, Result};

mod adapter;

pub const DIALECT: &str = "sqlite";
pub const DRIVERS: &[&str] = &["rusqlite"];

/// Blocking sqlite backend on `rusqlite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteBackend;

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn dialect(&self) -> &'static str {
        DIALECT
    }

    fn drivers(&self) -> &'static [&'static str] {
        DRIVERS
    }

    fn create_engine(&self, config: &ConnectionConfig) -> Result<Box<dyn Engine>> {
        adapter::create_engine(config)
    }
}
