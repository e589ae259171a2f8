use std::{
    fmt::Write as _,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use mysql::{
    OptsBuilder, Pool, PoolConstraints, PoolOpts, PooledConn, Value, prelude::Queryable,
};
use scopedb_core::{ConnectionConfig, Engine, Error, Result, Row, Session, TransactionOp};
use tracing::debug;

const BEGIN_SQL: &str = "BEGIN";
const COMMIT_SQL: &str = "COMMIT";
const ROLLBACK_SQL: &str = "ROLLBACK";
const MAX_CONNECTIONS: usize = 10;

pub(crate) struct MysqlEngine {
    shared: Arc<EngineShared>,
}

struct EngineShared {
    redacted_url: String,
    /// `None` once disposed; pooled connections still out close when returned.
    pool: Mutex<Option<Pool>>,
}

pub(crate) struct MysqlSession {
    shared: Arc<EngineShared>,
    connection: Option<PooledConn>,
    in_transaction: bool,
    closed: bool,
}

/// The pool starts empty and pings idle connections before handing them out.
pub(crate) fn create_engine(config: &ConnectionConfig) -> Result<Box<dyn Engine>> {
    let redacted_url = config.redacted_url();
    let constraints = PoolConstraints::new(0, MAX_CONNECTIONS).ok_or_else(|| {
        Error::connect(
            redacted_url.as_str(),
            io::Error::other("invalid mysql pool constraints"),
        )
    })?;
    let builder = OptsBuilder::new()
        .ip_or_hostname(Some(config.host.clone()))
        .tcp_port(config.port)
        .user(Some(config.user.clone()))
        .pass(Some(config.password.clone()))
        .db_name(Some(config.database.clone()))
        .pool_opts(
            PoolOpts::default()
                .with_constraints(constraints)
                .with_check_health(true),
        );
    let pool =
        Pool::new(builder).map_err(|source| Error::connect(redacted_url.as_str(), source))?;

    Ok(Box::new(MysqlEngine {
        shared: Arc::new(EngineShared {
            redacted_url,
            pool: Mutex::new(Some(pool)),
        }),
    }))
}

impl EngineShared {
    fn lock_pool(&self) -> MutexGuard<'_, Option<Pool>> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disposed(&self) -> bool {
        self.lock_pool().is_none()
    }

    fn checkout(&self) -> Result<PooledConn> {
        let pool = self.lock_pool().clone().ok_or(Error::Disposed)?;
        debug!(url = %self.redacted_url, "checking out mysql connection");
        pool.get_conn()
            .map_err(|source| Error::connect(self.redacted_url.as_str(), source))
    }
}

impl Engine for MysqlEngine {
    fn open_session(&self) -> Result<Box<dyn Session>> {
        if self.shared.is_disposed() {
            return Err(Error::Disposed);
        }
        Ok(Box::new(MysqlSession {
            shared: Arc::clone(&self.shared),
            connection: None,
            in_transaction: false,
            closed: false,
        }))
    }

    fn dispose(&self) -> Result<()> {
        if self.shared.lock_pool().take().is_some() {
            debug!(url = %self.shared.redacted_url, "mysql pool disposed");
        }
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }
}

impl MysqlSession {
    fn connection(&mut self) -> Result<&mut PooledConn> {
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
            .query_drop(BEGIN_SQL)
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
        self.connection()?
            .query_drop(sql)
            .map_err(|source| Error::transaction(operation, source))?;
        self.in_transaction = false;
        Ok(())
    }
}

impl Session for MysqlSession {
    fn execute(&mut self, sql: &str) -> Result<u64> {
        self.begin_if_needed()?;
        let connection = self.connection()?;
        connection
            .query_drop(sql)
            .map_err(|source| Error::statement(sql, source))?;
        Ok(connection.affected_rows())
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.begin_if_needed()?;
        let rows = self
            .connection()?
            .query::<mysql::Row, _>(sql)
            .map_err(|source| Error::statement(sql, source))?;
        rows.iter().map(|row| decode_row(sql, row)).collect()
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
            && rolled_back.is_err()
        {
            // Detach from the pool so the connection is dropped instead of reused.
            drop(connection.unwrap());
        }
        rolled_back.map_err(|error| match error {
            Error::Transaction { source, .. } => Error::transaction(TransactionOp::Close, source),
            other => other,
        })
    }
}

fn decode_row(sql: &str, row: &mysql::Row) -> Result<Row> {
    let columns = row
        .columns_ref()
        .iter()
        .map(|column| column.name_str().into_owned())
        .collect::<Vec<_>>();
    let mut values = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        let value = row.as_ref(index).ok_or_else(|| {
            Error::decode(
                sql,
                column.as_str(),
                io::Error::other("value was already taken from the row"),
            )
        })?;
        values.push(render_value(value));
    }
    Ok(Row::new(columns, values))
}

pub(crate) fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Int(value) => Some(value.to_string()),
        Value::UInt(value) => Some(value.to_string()),
        Value::Float(value) => Some(value.to_string()),
        Value::Double(value) => Some(value.to_string()),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut rendered =
                format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}");
            push_micros(&mut rendered, *micros);
            Some(rendered)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = u64::from(*days) * 24 + u64::from(*hours);
            let mut rendered = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            push_micros(&mut rendered, *micros);
            Some(rendered)
        }
    }
}

fn push_micros(rendered: &mut String, micros: u32) {
    if micros > 0 {
        let _ = write!(rendered, ".{micros:06}");
    }
}
