use std::{fmt::Write as _, sync::Arc};

use rusqlite::{Connection, types::ValueRef};
use scopedb_core::{
    ConnectionConfig, Engine, Error, IdlePool, Result, Row, Session, TransactionOp,
};
use tracing::debug;

const BEGIN_SQL: &str = "BEGIN";
const COMMIT_SQL: &str = "COMMIT";
const ROLLBACK_SQL: &str = "ROLLBACK";

pub(crate) struct SqliteEngine {
    shared: Arc<EngineShared>,
}

struct EngineShared {
    path: String,
    redacted_url: String,
    pool: IdlePool<Connection>,
}

pub(crate) struct SqliteSession {
    shared: Arc<EngineShared>,
    connection: Option<Connection>,
    in_transaction: bool,
    closed: bool,
}

/// `database` is the file path handed to sqlite; host, port and credentials
/// are only part of the URL.
pub(crate) fn create_engine(config: &ConnectionConfig) -> Result<Box<dyn Engine>> {
    Ok(Box::new(SqliteEngine {
        shared: Arc::new(EngineShared {
            path: config.database.clone(),
            redacted_url: config.redacted_url(),
            pool: IdlePool::default(),
        }),
    }))
}

impl EngineShared {
    fn checkout(&self) -> Result<Connection> {
        if let Some(connection) = self.pool.checkout()? {
            return Ok(connection);
        }
        debug!(path = %self.path, "opening sqlite connection");
        Connection::open(self.path.as_str())
            .map_err(|source| Error::connect(self.redacted_url.as_str(), source))
    }
}

impl Engine for SqliteEngine {
    fn open_session(&self) -> Result<Box<dyn Session>> {
        if self.shared.pool.is_disposed() {
            return Err(Error::Disposed);
        }
        Ok(Box::new(SqliteSession {
            shared: Arc::clone(&self.shared),
            connection: None,
            in_transaction: false,
            closed: false,
        }))
    }

    fn dispose(&self) -> Result<()> {
        let dropped = self.shared.pool.dispose();
        debug!(dropped, "sqlite pool disposed");
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.shared.pool.is_disposed()
    }
}

impl SqliteSession {
    fn connection(&mut self) -> Result<&mut Connection> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => self.shared.checkout()?,
        };
        Ok(self.connection.insert(connection))
    }

    fn begin_if_needed(&mut self) -> Result<()> {
        if self.in_transaction {
            return Ok(());
        }
        self.connection()?
            .execute_batch(BEGIN_SQL)
            .map_err(|source| Error::transaction(TransactionOp::Begin, source))?;
        self.in_transaction = true;
        Ok(())
    }

    fn end_transaction(&mut self, sql: &str, operation: TransactionOp) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        if !self.in_transaction {
            return Ok(());
        }
        let connection = self.connection()?;
        // Some failures make sqlite abandon the transaction on its own.
        if !connection.is_autocommit() {
            connection
                .execute_batch(sql)
                .map_err(|source| Error::transaction(operation, source))?;
        }
        self.in_transaction = false;
        Ok(())
    }
}

impl Session for SqliteSession {
    fn execute(&mut self, sql: &str) -> Result<u64> {
        self.begin_if_needed()?;
        let connection = self.connection()?;
        // `changes()` keeps the last DML count across DDL, so diff the running total.
        let before = connection.total_changes();
        connection
            .execute_batch(sql)
            .map_err(|source| Error::statement(sql, source))?;
        Ok(connection.total_changes().saturating_sub(before))
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.begin_if_needed()?;
        let connection = self.connection()?;
        let mut statement = connection
            .prepare(sql)
            .map_err(|source| Error::statement(sql, source))?;
        let columns = statement
            .column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        let mut rows = statement
            .query([])
            .map_err(|source| Error::statement(sql, source))?;

        let mut decoded = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|source| Error::statement(sql, source))?
        {
            let mut values = Vec::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                let value = row
                    .get_ref(index)
                    .map_err(|source| Error::decode(sql, column.as_str(), source))?;
                values.push(render_value(value));
            }
            decoded.push(Row::new(columns.clone(), values));
        }

        Ok(decoded)
    }

    fn commit(&mut self) -> Result<()> {
        self.end_transaction(COMMIT_SQL, TransactionOp::Commit)
    }

    fn rollback(&mut self) -> Result<()> {
        let rolled_back = self.end_transaction(ROLLBACK_SQL, TransactionOp::Rollback);
        self.in_transaction = false;
        rolled_back
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let rolled_back = self.rollback();
        self.closed = true;
        if let Some(connection) = self.connection.take()
            && rolled_back.is_ok()
        {
            self.shared.pool.checkin(connection);
        }
        rolled_back.map_err(|error| match error {
            Error::Transaction { source, .. } => Error::transaction(TransactionOp::Close, source),
            other => other,
        })
    }
}

fn render_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Some(render_blob(bytes)),
    }
}

fn render_blob(bytes: &[u8]) -> String {
    let mut rendered = String::with_capacity(bytes.len() * 2 + 3);
    rendered.push_str("x'");
    for byte in bytes {
        let _ = write!(rendered, "{byte:02x}");
    }
    rendered.push('\'');
    rendered
}
