use std::{sync::Arc, time::Duration};

use postgres::{Client, NoTls, SimpleQueryMessage};
use scopedb_core::{
    ConnectionConfig, Engine, Error, IdlePool, Result, Row, Session, TransactionOp,
};
use tracing::debug;

const BEGIN_SQL: &str = "BEGIN";
const COMMIT_SQL: &str = "COMMIT";
const ROLLBACK_SQL: &str = "ROLLBACK";
const VALIDATION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) struct PostgresEngine {
    shared: Arc<EngineShared>,
}

struct EngineShared {
    config: postgres::Config,
    redacted_url: String,
    pool: IdlePool<Client>,
}

pub(crate) struct PostgresSession {
    shared: Arc<EngineShared>,
    client: Option<Client>,
    in_transaction: bool,
    closed: bool,
}

pub(crate) fn create_engine(config: &ConnectionConfig) -> Result<Box<dyn Engine>> {
    let mut postgres_config = postgres::Config::new();
    postgres_config
        .host(&config.host)
        .port(config.port)
        .user(&config.user)
        .password(&config.password)
        .dbname(&config.database);

    Ok(Box::new(PostgresEngine {
        shared: Arc::new(EngineShared {
            config: postgres_config,
            redacted_url: config.redacted_url(),
            pool: IdlePool::default(),
        }),
    }))
}

impl EngineShared {
    fn checkout(&self) -> Result<Client> {
        while let Some(mut client) = self.pool.checkout()? {
            if !client.is_closed() && client.is_valid(VALIDATION_TIMEOUT).is_ok() {
                return Ok(client);
            }
            debug!("discarding broken postgres connection");
        }
        debug!(url = %self.redacted_url, "opening postgres connection");
        self.config
            .connect(NoTls)
            .map_err(|source| Error::connect(self.redacted_url.as_str(), source))
    }
}

impl Engine for PostgresEngine {
    fn open_session(&self) -> Result<Box<dyn Session>> {
        if self.shared.pool.is_disposed() {
            return Err(Error::Disposed);
        }
        Ok(Box::new(PostgresSession {
            shared: Arc::clone(&self.shared),
            client: None,
            in_transaction: false,
            closed: false,
        }))
    }

    fn dispose(&self) -> Result<()> {
        let dropped = self.shared.pool.dispose();
        debug!(dropped, "postgres pool disposed");
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.shared.pool.is_disposed()
    }
}

impl PostgresSession {
    fn client(&mut self) -> Result<&mut Client> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        let client = match self.client.take() {
            Some(client) => client,
            None => self.shared.checkout()?,
        };
        Ok(self.client.insert(client))
    }

    fn begin_if_needed(&mut self) -> Result<()> {
        if self.in_transaction {
            return Ok(());
        }
        self.client()?
            .batch_execute(BEGIN_SQL)
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
        self.client()?
            .batch_execute(sql)
            .map_err(|source| Error::transaction(operation, source))?;
        self.in_transaction = false;
        Ok(())
    }

    fn simple_query(&mut self, sql: &str) -> Result<Vec<SimpleQueryMessage>> {
        self.begin_if_needed()?;
        self.client()?
            .simple_query(sql)
            .map_err(|source| Error::statement(sql, source))
    }
}

impl Session for PostgresSession {
    fn execute(&mut self, sql: &str) -> Result<u64> {
        let messages = self.simple_query(sql)?;
        Ok(affected_rows(&messages))
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        let messages = self.simple_query(sql)?;
        decode_rows(sql, &messages)
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
        if let Some(client) = self.client.take()
            && rolled_back.is_ok()
        {
            self.shared.pool.checkin(client);
        }
        rolled_back.map_err(|error| match error {
            Error::Transaction { source, .. } => Error::transaction(TransactionOp::Close, source),
            other => other,
        })
    }
}

/// Count reported by the last statement of the batch.
fn affected_rows(messages: &[SimpleQueryMessage]) -> u64 {
    messages
        .iter()
        .rev()
        .find_map(|message| match message {
            SimpleQueryMessage::CommandComplete(count) => Some(*count),
            _ => None,
        })
        .unwrap_or(0)
}

fn decode_rows(sql: &str, messages: &[SimpleQueryMessage]) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for message in messages {
        let SimpleQueryMessage::Row(row) = message else {
            continue;
        };
        let columns = row
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect::<Vec<_>>();
        let mut values = Vec::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let value = row
                .try_get(index)
                .map_err(|source| Error::decode(sql, column.as_str(), source))?;
            values.push(value.map(ToString::to_string));
        }
        rows.push(Row::new(columns, values));
    }
    Ok(rows)
}
