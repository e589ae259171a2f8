use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use scopedb_core::{
    AsyncEngine, AsyncSession, ConnectionConfig, Error, Result, Row, TransactionOp,
};
use sqlx::{
    Column as _, ConnectOptions as _, Postgres, Row as _,
    pool::PoolConnection,
    postgres::{
        PgConnectOptions, PgConnection, PgPool, PgPoolOptions, PgQueryResult, PgRow,
    },
};
use tracing::debug;

const BEGIN_SQL: &str = "BEGIN";
const COMMIT_SQL: &str = "COMMIT";
const ROLLBACK_SQL: &str = "ROLLBACK";
const MAX_CONNECTIONS: u32 = 10;

pub(crate) struct SqlxEngine {
    pool: PgPool,
    redacted_url: Arc<str>,
}

pub(crate) struct SqlxSession {
    pool: PgPool,
    redacted_url: Arc<str>,
    connection: Option<PoolConnection<Postgres>>,
    in_transaction: bool,
    closed: bool,
}

/// Connections are opened on first use, so this never touches the network.
pub(crate) fn create_engine(config: &ConnectionConfig) -> Result<Box<dyn AsyncEngine>> {
    // Statements are echoed by the session factory when asked to.
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .disable_statement_logging();
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_lazy_with(options);

    Ok(Box::new(SqlxEngine {
        pool,
        redacted_url: Arc::from(config.redacted_url()),
    }))
}

#[async_trait]
impl AsyncEngine for SqlxEngine {
    async fn open_session(&self) -> Result<Box<dyn AsyncSession>> {
        if self.pool.is_closed() {
            return Err(Error::Disposed);
        }
        Ok(Box::new(SqlxSession {
            pool: self.pool.clone(),
            redacted_url: Arc::clone(&self.redacted_url),
            connection: None,
            in_transaction: false,
            closed: false,
        }))
    }

    async fn dispose(&self) -> Result<()> {
        self.pool.close().await;
        debug!(url = %self.redacted_url, "sqlx postgres pool closed");
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.pool.is_closed()
    }
}

impl SqlxSession {
    /// Takes the session's connection out, acquiring one on first use. Callers
    /// put it back with [`SqlxSession::restore`] once the statement is done.
    async fn take_connection(&mut self) -> Result<PoolConnection<Postgres>> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        match self.connection.take() {
            Some(connection) => Ok(connection),
            None => self.pool.acquire().await.map_err(|source| match source {
                sqlx::Error::PoolClosed => Error::Disposed,
                source => Error::connect(&*self.redacted_url, source),
            }),
        }
    }

    fn restore(&mut self, connection: PoolConnection<Postgres>) {
        self.connection = Some(connection);
    }

    async fn begin_if_needed(&mut self) -> Result<()> {
        if self.in_transaction {
            return Ok(());
        }
        let mut connection = self.take_connection().await?;
        let begun = run_execute(&mut connection, BEGIN_SQL).await;
        self.restore(connection);
        begun.map_err(|source| Error::transaction(TransactionOp::Begin, source))?;
        self.in_transaction = true;
        Ok(())
    }

    async fn end_transaction(&mut self, sql: &str, operation: TransactionOp) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        if !self.in_transaction {
            return Ok(());
        }
        let mut connection = self.take_connection().await?;
        let ended = run_execute(&mut connection, sql).await;
        self.restore(connection);
        ended.map_err(|source| Error::transaction(operation, source))?;
        self.in_transaction = false;
        Ok(())
    }
}

#[async_trait]
impl AsyncSession for SqlxSession {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.begin_if_needed().await?;
        let mut connection = self.take_connection().await?;
        let result = run_execute(&mut connection, sql).await;
        self.restore(connection);
        let result = result.map_err(|source| Error::statement(sql, source))?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.begin_if_needed().await?;
        let mut connection = self.take_connection().await?;
        let rows = run_fetch_all(&mut connection, sql).await;
        self.restore(connection);
        let rows = rows.map_err(|source| Error::statement(sql, source))?;
        rows.iter().map(|row| decode_row(sql, row)).collect()
    }

    async fn commit(&mut self) -> Result<()> {
        self.end_transaction(COMMIT_SQL, TransactionOp::Commit).await
    }

    async fn rollback(&mut self) -> Result<()> {
        let rolled_back = self
            .end_transaction(ROLLBACK_SQL, TransactionOp::Rollback)
            .await;
        self.in_transaction = false;
        rolled_back
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let rolled_back = self.rollback().await;
        self.closed = true;
        if let Some(connection) = self.connection.take()
            && rolled_back.is_err()
        {
            // Never hand a connection with an unknown transaction state back to the pool.
            if let Err(error) = connection.close().await {
                debug!(%error, "closing postgres connection failed");
            }
        }
        rolled_back.map_err(|error| match error {
            Error::Transaction { source, .. } => Error::transaction(TransactionOp::Close, source),
            other => other,
        })
    }
}

// Boxing pins the executor lifetime so the session futures stay `Send`.
fn run_execute<'c>(
    connection: &'c mut PgConnection,
    sql: &'c str,
) -> BoxFuture<'c, sqlx::Result<PgQueryResult>> {
    sqlx::Executor::execute(connection, sqlx::raw_sql(sql))
}

fn run_fetch_all<'c>(
    connection: &'c mut PgConnection,
    sql: &'c str,
) -> BoxFuture<'c, sqlx::Result<Vec<PgRow>>> {
    sqlx::Executor::fetch_all(connection, sqlx::raw_sql(sql))
}

/// Simple-protocol results arrive as text, so every cell decodes as a string.
fn decode_row(sql: &str, row: &PgRow) -> Result<Row> {
    let columns = row
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect::<Vec<_>>();
    let mut values = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        let value = row
            .try_get_unchecked::<Option<String>, _>(index)
            .map_err(|source| Error::decode(sql, column.as_str(), source))?;
        values.push(value);
    }
    Ok(Row::new(columns, values))
}
