use async_trait::async_trait;
use tracing::info;

use crate::{AsyncSession, Result, Row, Session};

pub(crate) struct EchoSession {
    id: u64,
    inner: Box<dyn Session>,
}

impl EchoSession {
    pub(crate) fn new(id: u64, inner: Box<dyn Session>) -> Self {
        Self { id, inner }
    }
}

impl Session for EchoSession {
    fn execute(&mut self, sql: &str) -> Result<u64> {
        info!(target: "scopedb::echo", session = self.id, "{sql}");
        self.inner.execute(sql)
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        info!(target: "scopedb::echo", session = self.id, "{sql}");
        self.inner.query(sql)
    }

    fn commit(&mut self) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, "COMMIT");
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, "ROLLBACK");
        self.inner.rollback()
    }

    fn close(&mut self) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, "close");
        self.inner.close()
    }

    fn savepoint(&mut self, name: &str) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, savepoint = name, "savepoint");
        self.inner.savepoint(name)
    }

    fn release_savepoint(&mut self, name: &str) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, savepoint = name, "release savepoint");
        self.inner.release_savepoint(name)
    }

    fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        info!(
            target: "scopedb::echo",
            session = self.id,
            savepoint = name,
            "rollback to savepoint"
        );
        self.inner.rollback_to_savepoint(name)
    }
}

pub(crate) struct EchoAsyncSession {
    id: u64,
    inner: Box<dyn AsyncSession>,
}

impl EchoAsyncSession {
    pub(crate) fn new(id: u64, inner: Box<dyn AsyncSession>) -> Self {
        Self { id, inner }
    }
}

#[async_trait]
impl AsyncSession for EchoAsyncSession {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        info!(target: "scopedb::echo", session = self.id, "{sql}");
        self.inner.execute(sql).await
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        info!(target: "scopedb::echo", session = self.id, "{sql}");
        self.inner.query(sql).await
    }

    async fn commit(&mut self) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, "COMMIT");
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, "ROLLBACK");
        self.inner.rollback().await
    }

    async fn close(&mut self) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, "close");
        self.inner.close().await
    }

    async fn savepoint(&mut self, name: &str) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, savepoint = name, "savepoint");
        self.inner.savepoint(name).await
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        info!(target: "scopedb::echo", session = self.id, savepoint = name, "release savepoint");
        self.inner.release_savepoint(name).await
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        info!(
            target: "scopedb::echo",
            session = self.id,
            savepoint = name,
            "rollback to savepoint"
        );
        self.inner.rollback_to_savepoint(name).await
    }
}
