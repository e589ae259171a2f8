use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tracing::{debug, info};

use crate::{
    AsyncBackend, AsyncEngine, AsyncSession, AsyncSessionFactory, AsyncSessionScope, Backend,
    ConnectionConfig, Engine, Error, Result, Session, SessionFactory, SessionScope,
    engine::ensure_supported,
};

/// Blocking session-manager contract.
pub trait DbManager {
    /// Builds the session factory. Must run before [`DbManager::get_db`].
    fn initialize(&mut self) -> Result<()>;
    /// Opens a fresh session wrapped in a scope that commits or rolls back,
    /// then closes it.
    fn get_db(&self) -> Result<SessionScope>;
    /// Disposes the engine's pool. Later calls are no-ops.
    fn clean_up(&mut self) -> Result<()>;
}

/// Suspending session-manager contract.
#[async_trait]
pub trait AsyncDbManager: Send + Sync {
    async fn initialize(&mut self) -> Result<()>;
    async fn get_db(&self) -> Result<AsyncSessionScope>;
    async fn clean_up(&mut self) -> Result<()>;
}

pub struct EngineManager {
    config: ConnectionConfig,
    url: String,
    engine: Option<Arc<dyn Engine>>,
    factory: Option<SessionFactory>,
}

impl EngineManager {
    /// Opens the engine through `backend` and initializes the session factory.
    pub fn new(backend: &dyn Backend, config: ConnectionConfig) -> Result<Self> {
        ensure_supported(backend.name(), backend.dialect(), backend.drivers(), &config)?;
        let engine = backend.create_engine(&config)?;
        info!(
            backend = backend.name(),
            url = %config.redacted_url(),
            echo = config.echo,
            "engine created"
        );

        let mut manager = Self::from_engine(config, Arc::from(engine));
        manager.initialize()?;
        Ok(manager)
    }

    /// Wraps an existing engine. The manager is not initialized yet.
    #[must_use]
    pub fn from_engine(config: ConnectionConfig, engine: Arc<dyn Engine>) -> Self {
        Self {
            url: config.url(),
            config,
            engine: Some(engine),
            factory: None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.factory.is_some()
    }

    #[must_use]
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Runs `f` inside a fresh session scope.
    pub fn with_db<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        E: From<Error>,
        F: FnOnce(&mut dyn Session) -> std::result::Result<T, E>,
    {
        let mut scope = self.get_db()?;
        let outcome = match scope.session() {
            Ok(session) => f(session),
            Err(error) => Err(error.into()),
        };
        scope.finish(outcome)
    }
}

impl DbManager for EngineManager {
    fn initialize(&mut self) -> Result<()> {
        let engine = self.engine.as_ref().ok_or(Error::Disposed)?;
        if engine.is_disposed() {
            return Err(Error::Disposed);
        }
        self.factory = Some(SessionFactory::new(Arc::clone(engine), self.config.echo));
        debug!(url = %self.config.redacted_url(), "session factory initialized");
        Ok(())
    }

    fn get_db(&self) -> Result<SessionScope> {
        if self.engine.is_none() {
            return Err(Error::Disposed);
        }
        let factory = self.factory.as_ref().ok_or(Error::NotInitialized)?;
        Ok(SessionScope::new(factory.open()?))
    }

    fn clean_up(&mut self) -> Result<()> {
        self.factory = None;
        if let Some(engine) = self.engine.take() {
            engine.dispose()?;
            info!(url = %self.config.redacted_url(), "engine disposed");
        }
        Ok(())
    }
}

pub struct AsyncEngineManager {
    config: ConnectionConfig,
    url: String,
    engine: Option<Arc<dyn AsyncEngine>>,
    factory: Option<AsyncSessionFactory>,
}

impl AsyncEngineManager {
    pub async fn new(backend: &dyn AsyncBackend, config: ConnectionConfig) -> Result<Self> {
        ensure_supported(backend.name(), backend.dialect(), backend.drivers(), &config)?;
        let engine = backend.create_engine(&config).await?;
        info!(
            backend = backend.name(),
            url = %config.redacted_url(),
            echo = config.echo,
            "engine created"
        );

        let mut manager = Self::from_engine(config, Arc::from(engine));
        manager.initialize().await?;
        Ok(manager)
    }

    #[must_use]
    pub fn from_engine(config: ConnectionConfig, engine: Arc<dyn AsyncEngine>) -> Self {
        Self {
            url: config.url(),
            config,
            engine: Some(engine),
            factory: None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.factory.is_some()
    }

    #[must_use]
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub async fn with_db<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        E: From<Error>,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, std::result::Result<T, E>>,
    {
        let mut scope = self.get_db().await?;
        let outcome = match scope.session() {
            Ok(session) => f(session).await,
            Err(error) => Err(error.into()),
        };
        scope.finish(outcome).await
    }
}

#[async_trait]
impl AsyncDbManager for AsyncEngineManager {
    async fn initialize(&mut self) -> Result<()> {
        let engine = self.engine.as_ref().ok_or(Error::Disposed)?;
        if engine.is_disposed() {
            return Err(Error::Disposed);
        }
        self.factory = Some(AsyncSessionFactory::new(
            Arc::clone(engine),
            self.config.echo,
        ));
        debug!(url = %self.config.redacted_url(), "session factory initialized");
        Ok(())
    }

    async fn get_db(&self) -> Result<AsyncSessionScope> {
        if self.engine.is_none() {
            return Err(Error::Disposed);
        }
        let factory = self.factory.as_ref().ok_or(Error::NotInitialized)?;
        Ok(AsyncSessionScope::new(factory.open().await?))
    }

    async fn clean_up(&mut self) -> Result<()> {
        self.factory = None;
        if let Some(engine) = self.engine.take() {
            engine.dispose().await?;
            info!(url = %self.config.redacted_url(), "engine disposed");
        }
        Ok(())
    }
}
