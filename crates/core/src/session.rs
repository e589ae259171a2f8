use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tracing::warn;

use crate::{Error, Result};

/// A result row with every cell rendered as text. `None` is SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<Option<String>>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|name| name == column)?;
        self.get_index(index)
    }

    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.values.get(index)?.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Option<String>> {
        self.values
    }
}

/// Blocking unit of work bound to an engine.
///
/// Implementations begin a transaction lazily on the first statement, so
/// `commit` and `rollback` are no-ops on a session that never ran anything.
/// `close` rolls back whatever is still open and hands the physical
/// connection back to the engine; any call after `close` fails with
/// [`Error::SessionClosed`].
pub trait Session: Send {
    fn execute(&mut self, sql: &str) -> Result<u64>;
    fn query(&mut self, sql: &str) -> Result<Vec<Row>>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    fn savepoint(&mut self, name: &str) -> Result<()> {
        self.execute(&format!("SAVEPOINT {name}")).map(drop)
    }

    fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.execute(&format!("RELEASE SAVEPOINT {name}")).map(drop)
    }

    fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.execute(&format!("ROLLBACK TO SAVEPOINT {name}")).map(drop)
    }
}

/// Suspending counterpart of [`Session`].
#[async_trait]
pub trait AsyncSession: Send {
    async fn execute(&mut self, sql: &str) -> Result<u64>;
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>>;
    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;
    async fn close(&mut self) -> Result<()>;

    async fn savepoint(&mut self, name: &str) -> Result<()> {
        self.execute(&format!("SAVEPOINT {name}")).await.map(drop)
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.execute(&format!("RELEASE SAVEPOINT {name}")).await.map(drop)
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.execute(&format!("ROLLBACK TO SAVEPOINT {name}")).await.map(drop)
    }
}

/// Runs `f` inside savepoint `name`: released on success, rolled back to on
/// failure. The caller's error is returned as is.
pub fn nested<T, E, F>(session: &mut dyn Session, name: &str, f: F) -> std::result::Result<T, E>
where
    E: From<Error>,
    F: FnOnce(&mut dyn Session) -> std::result::Result<T, E>,
{
    session.savepoint(name)?;
    match f(&mut *session) {
        Ok(value) => {
            session.release_savepoint(name)?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = session.rollback_to_savepoint(name) {
                warn!(savepoint = name, error = %rollback_error, "rollback to savepoint failed");
            }
            Err(error)
        }
    }
}

pub async fn nested_async<T, E, F>(
    session: &mut dyn AsyncSession,
    name: &str,
    f: F,
) -> std::result::Result<T, E>
where
    E: From<Error>,
    F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, std::result::Result<T, E>>,
{
    session.savepoint(name).await?;
    match f(&mut *session).await {
        Ok(value) => {
            session.release_savepoint(name).await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = session.rollback_to_savepoint(name).await {
                warn!(savepoint = name, error = %rollback_error, "rollback to savepoint failed");
            }
            Err(error)
        }
    }
}
