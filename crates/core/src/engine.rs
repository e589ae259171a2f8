use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    AsyncSession, ConnectionConfig, Error, Result, Session,
    echo::{EchoAsyncSession, EchoSession},
};

/// Owner of the physical connections for one connection URL.
pub trait Engine: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn Session>>;
    /// Releases pooled connections. Calling it again is a no-op.
    fn dispose(&self) -> Result<()>;
    fn is_disposed(&self) -> bool;
}

#[async_trait]
pub trait AsyncEngine: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn AsyncSession>>;
    async fn dispose(&self) -> Result<()>;
    fn is_disposed(&self) -> bool;
}

/// Turns a [`ConnectionConfig`] into a blocking engine for one dialect.
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;
    fn dialect(&self) -> &'static str;
    fn drivers(&self) -> &'static [&'static str];
    fn create_engine(&self, config: &ConnectionConfig) -> Result<Box<dyn Engine>>;
}

#[async_trait]
pub trait AsyncBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn dialect(&self) -> &'static str;
    fn drivers(&self) -> &'static [&'static str];
    async fn create_engine(&self, config: &ConnectionConfig) -> Result<Box<dyn AsyncEngine>>;
}

pub fn ensure_supported(
    backend: &'static str,
    dialect: &'static str,
    drivers: &'static [&'static str],
    config: &ConnectionConfig,
) -> Result<()> {
    let dialect_matches = config.dialect.eq_ignore_ascii_case(dialect);
    let driver_matches = drivers
        .iter()
        .any(|driver| config.driver.eq_ignore_ascii_case(driver));
    if dialect_matches && driver_matches {
        return Ok(());
    }

    Err(Error::UnsupportedDriver {
        backend,
        dialect: config.dialect.clone(),
        driver: config.driver.clone(),
        expected_dialect: dialect,
        expected_drivers: drivers.join(", "),
    })
}

/// Opens a fresh session per call. Built once by `initialize`.
pub struct SessionFactory {
    engine: Arc<dyn Engine>,
    echo: bool,
    opened: AtomicU64,
}

impl SessionFactory {
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>, echo: bool) -> Self {
        Self {
            engine,
            echo,
            opened: AtomicU64::new(0),
        }
    }

    pub fn open(&self) -> Result<Box<dyn Session>> {
        let session = self.engine.open_session()?;
        let id = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(session = id, "session opened");
        if self.echo {
            return Ok(Box::new(EchoSession::new(id, session)));
        }
        Ok(session)
    }

    #[must_use]
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }
}

pub struct AsyncSessionFactory {
    engine: Arc<dyn AsyncEngine>,
    echo: bool,
    opened: AtomicU64,
}

impl AsyncSessionFactory {
    #[must_use]
    pub fn new(engine: Arc<dyn AsyncEngine>, echo: bool) -> Self {
        Self {
            engine,
            echo,
            opened: AtomicU64::new(0),
        }
    }

    pub async fn open(&self) -> Result<Box<dyn AsyncSession>> {
        let session = self.engine.open_session().await?;
        let id = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(session = id, "session opened");
        if self.echo {
            return Ok(Box::new(EchoAsyncSession::new(id, session)));
        }
        Ok(session)
    }

    #[must_use]
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }
}
