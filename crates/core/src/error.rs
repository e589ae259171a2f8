use std::{error::Error as StdError, fmt};

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOp {
    Begin,
    Commit,
    Rollback,
    Close,
    Savepoint,
}

impl TransactionOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::Close => "close",
            Self::Savepoint => "savepoint",
        }
    }
}

impl fmt::Display for TransactionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "backend `{backend}` cannot serve `{dialect}+{driver}`; it accepts `{expected_dialect}` with drivers [{expected_drivers}]"
    )]
    UnsupportedDriver {
        backend: &'static str,
        dialect: String,
        driver: String,
        expected_dialect: &'static str,
        expected_drivers: String,
    },
    #[error("failed to load connection config from {origin}")]
    Config {
        origin: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to connect to `{url}`")]
    Connect {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("statement failed: {sql}")]
    Statement {
        sql: String,
        #[source]
        source: BoxError,
    },
    #[error("{operation} failed")]
    Transaction {
        operation: TransactionOp,
        #[source]
        source: BoxError,
    },
    #[error("failed to decode column `{column}` of `{sql}`")]
    Decode {
        sql: String,
        column: String,
        #[source]
        source: BoxError,
    },
    #[error("session factory is not initialized; call initialize() before get_db()")]
    NotInitialized,
    #[error("engine has been disposed")]
    Disposed,
    #[error("session is closed")]
    SessionClosed,
}

impl Error {
    pub fn connect<E>(url: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Connect {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn statement<E>(sql: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Statement {
            sql: sql.into(),
            source: source.into(),
        }
    }

    pub fn transaction<E>(operation: TransactionOp, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Transaction {
            operation,
            source: source.into(),
        }
    }

    pub fn decode<E>(sql: impl Into<String>, column: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Decode {
            sql: sql.into(),
            column: column.into(),
            source: source.into(),
        }
    }

    /// Short category tag used when presenting errors to operators.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedDriver { .. } | Self::Config { .. } => "config",
            Self::Connect { .. } => "connect",
            Self::Statement { .. } | Self::Decode { .. } => "execute",
            Self::Transaction { .. } => "transaction",
            Self::NotInitialized | Self::Disposed | Self::SessionClosed => "lifecycle",
        }
    }
}
