use std::{borrow::Cow, fmt::Write as _, io, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::TryStreamExt as _;
use scopedb_core::{
    AsyncEngine, AsyncSession, ConnectionConfig, Error, IdlePool, Result, Row, TransactionOp,
};
use tiberius::{AuthMethod, Client, ColumnData, Config, QueryItem};
use tokio::{net::TcpStream, time::timeout};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

type TdsClient = Client<Compat<TcpStream>>;

const BEGIN_SQL: &str = "BEGIN TRANSACTION";
const COMMIT_SQL: &str = "COMMIT TRANSACTION";
// A failed statement may already have ended the transaction server-side.
const ROLLBACK_SQL: &str = "IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const VALIDATION_SQL: &str = "SELECT 1";
const VALIDATION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) struct MssqlEngine {
    shared: Arc<EngineShared>,
}

struct EngineShared {
    config: Config,
    redacted_url: String,
    pool: IdlePool<TdsClient>,
}

pub(crate) struct MssqlSession {
    shared: Arc<EngineShared>,
    client: Option<TdsClient>,
    in_transaction: bool,
    closed: bool,
}

pub(crate) fn create_engine(config: &ConnectionConfig) -> Box<dyn AsyncEngine> {
    let mut tds_config = Config::new();
    tds_config.host(config.host.as_str());
    tds_config.port(config.port);
    tds_config.database(config.database.as_str());
    tds_config.authentication(AuthMethod::sql_server(
        config.user.as_str(),
        config.password.as_str(),
    ));
    tds_config.trust_cert();

    Box::new(MssqlEngine {
        shared: Arc::new(EngineShared {
            config: tds_config,
            redacted_url: config.redacted_url(),
            pool: IdlePool::default(),
        }),
    })
}

impl EngineShared {
    async fn checkout(&self) -> Result<TdsClient> {
        while let Some(mut client) = self.pool.checkout()? {
            if is_alive(&mut client).await {
                return Ok(client);
            }
            debug!("discarding broken mssql connection");
        }
        debug!(url = %self.redacted_url, "opening mssql connection");
        match timeout(CONNECT_TIMEOUT, self.connect()).await {
            Ok(connected) => connected,
            Err(elapsed) => Err(Error::connect(self.redacted_url.as_str(), elapsed)),
        }
    }

    async fn connect(&self) -> Result<TdsClient> {
        let connect_error = |source: io::Error| Error::connect(self.redacted_url.as_str(), source);
        let tcp = TcpStream::connect(self.config.get_addr())
            .await
            .map_err(connect_error)?;
        tcp.set_nodelay(true).map_err(connect_error)?;

        Client::connect(self.config.clone(), tcp.compat_write())
            .await
            .map_err(|source| Error::connect(self.redacted_url.as_str(), source))
    }
}

#[async_trait]
impl AsyncEngine for MssqlEngine {
    async fn open_session(&self) -> Result<Box<dyn AsyncSession>> {
        if self.shared.pool.is_disposed() {
            return Err(Error::Disposed);
        }
        Ok(Box::new(MssqlSession {
            shared: Arc::clone(&self.shared),
            client: None,
            in_transaction: false,
            closed: false,
        }))
    }

    async fn dispose(&self) -> Result<()> {
        let dropped = self.shared.pool.dispose();
        debug!(dropped, "mssql pool disposed");
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.shared.pool.is_disposed()
    }
}

impl MssqlSession {
    async fn client(&mut self) -> Result<&mut TdsClient> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        let client = match self.client.take() {
            Some(client) => client,
            None => self.shared.checkout().await?,
        };
        Ok(self.client.insert(client))
    }

    async fn begin_if_needed(&mut self) -> Result<()> {
        if self.in_transaction {
            return Ok(());
        }
        let client = self.client().await?;
        run_batch(client, BEGIN_SQL)
            .await
            .map_err(|source| Error::transaction(TransactionOp::Begin, source))?;
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
        let client = self.client().await?;
        run_batch(client, sql)
            .await
            .map_err(|source| Error::transaction(operation, source))?;
        self.in_transaction = false;
        Ok(())
    }

    async fn savepoint_batch(&mut self, sql: String) -> Result<()> {
        self.begin_if_needed().await?;
        let client = self.client().await?;
        run_batch(client, &sql)
            .await
            .map_err(|source| Error::transaction(TransactionOp::Savepoint, source))
    }
}

#[async_trait]
impl AsyncSession for MssqlSession {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.begin_if_needed().await?;
        let client = self.client().await?;
        let result = client
            .execute(sql, &[])
            .await
            .map_err(|source| Error::statement(sql, source))?;
        Ok(result.total())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.begin_if_needed().await?;
        let client = self.client().await?;
        let mut stream = client
            .simple_query(sql)
            .await
            .map_err(|source| Error::statement(sql, source))?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        while let Some(item) = stream
            .try_next()
            .await
            .map_err(|source| Error::statement(sql, source))?
        {
            match item {
                QueryItem::Metadata(metadata) => {
                    columns = metadata
                        .columns()
                        .iter()
                        .map(|column| column.name().to_string())
                        .collect();
                }
                QueryItem::Row(row) => {
                    let values = row.into_iter().map(render_column).collect();
                    rows.push(Row::new(columns.clone(), values));
                }
            }
        }
        Ok(rows)
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

    async fn savepoint(&mut self, name: &str) -> Result<()> {
        self.savepoint_batch(format!("SAVE TRANSACTION {name}")).await
    }

    /// SQL Server has no release; the savepoint lives until the transaction ends.
    async fn release_savepoint(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.savepoint_batch(format!("ROLLBACK TRANSACTION {name}")).await
    }
}

async fn run_batch(client: &mut TdsClient, sql: &str) -> tiberius::Result<()> {
    client.simple_query(sql).await?.into_results().await?;
    Ok(())
}

/// Idle connections can be cut by the server, so each one is pinged before reuse.
async fn is_alive(client: &mut TdsClient) -> bool {
    matches!(
        timeout(VALIDATION_TIMEOUT, run_batch(client, VALIDATION_SQL)).await,
        Ok(Ok(()))
    )
}

fn render_column(data: ColumnData<'static>) -> Option<String> {
    match data {
        ColumnData::U8(value) => value.map(|value| value.to_string()),
        ColumnData::I16(value) => value.map(|value| value.to_string()),
        ColumnData::I32(value) => value.map(|value| value.to_string()),
        ColumnData::I64(value) => value.map(|value| value.to_string()),
        ColumnData::F32(value) => value.map(|value| value.to_string()),
        ColumnData::F64(value) => value.map(|value| value.to_string()),
        ColumnData::Bit(value) => value.map(|value| u8::from(value).to_string()),
        ColumnData::String(value) => value.map(Cow::into_owned),
        ColumnData::Guid(value) => value.map(|value| value.to_string()),
        ColumnData::Binary(value) => value.map(|bytes| render_binary(&bytes)),
        ColumnData::Numeric(value) => value.map(|value| value.to_string()),
        ColumnData::Xml(value) => value.map(|xml| xml.into_owned().into_string()),
        ColumnData::DateTime(value) => value.map(|value| format!("{value:?}")),
        ColumnData::SmallDateTime(value) => value.map(|value| format!("{value:?}")),
        ColumnData::Time(value) => value.map(|value| format!("{value:?}")),
        ColumnData::Date(value) => value.map(|value| format!("{value:?}")),
        ColumnData::DateTime2(value) => value.map(|value| format!("{value:?}")),
        ColumnData::DateTimeOffset(value) => value.map(|value| format!("{value:?}")),
    }
}

fn render_binary(bytes: &[u8]) -> String {
    let mut rendered = String::with_capacity(bytes.len() * 2 + 2);
    rendered.push_str("0x");
    for byte in bytes {
        let _ = write!(rendered, "{byte:02X}");
    }
    rendered
}
