use scopedb_core::{AsyncBackend, Backend, ConnectionConfig};

use crate::error_presentation::{CliError, CliResult};

pub(crate) enum Selected {
    Blocking(Box<dyn Backend>),
    Async(Box<dyn AsyncBackend>),
}

/// Picks the backend serving `config.dialect`. The driver only chooses the
/// flavor; an unknown driver falls through to the blocking backend, whose
/// driver check reports it.
pub(crate) fn select(config: &ConnectionConfig) -> CliResult<Selected> {
    let dialect = config.dialect.to_ascii_lowercase();

    match dialect.as_str() {
        #[cfg(feature = "postgres")]
        scopedb_dialect_postgres::DIALECT => {
            if uses_driver(config, scopedb_dialect_postgres::ASYNC_DRIVERS) {
                Ok(Selected::Async(Box::new(
                    scopedb_dialect_postgres::PostgresAsyncBackend,
                )))
            } else {
                Ok(Selected::Blocking(Box::new(
                    scopedb_dialect_postgres::PostgresBackend,
                )))
            }
        }
        #[cfg(feature = "mysql")]
        scopedb_dialect_mysql::DIALECT => {
            if uses_driver(config, scopedb_dialect_mysql::ASYNC_DRIVERS) {
                Ok(Selected::Async(Box::new(
                    scopedb_dialect_mysql::MysqlAsyncBackend,
                )))
            } else {
                Ok(Selected::Blocking(Box::new(scopedb_dialect_mysql::MysqlBackend)))
            }
        }
        #[cfg(feature = "sqlite")]
        scopedb_dialect_sqlite::DIALECT => {
            Ok(Selected::Blocking(Box::new(scopedb_dialect_sqlite::SqliteBackend)))
        }
        #[cfg(feature = "mssql")]
        scopedb_dialect_mssql::DIALECT => Ok(Selected::Async(Box::new(
            scopedb_dialect_mssql::MssqlAsyncBackend,
        ))),
        _ => Err(CliError::UnknownDialect {
            dialect: config.dialect.clone(),
        }),
    }
}

#[cfg(any(feature = "postgres", feature = "mysql"))]
fn uses_driver(config: &ConnectionConfig, drivers: &[&str]) -> bool {
    drivers
        .iter()
        .any(|driver| config.driver.eq_ignore_ascii_case(driver))
}
