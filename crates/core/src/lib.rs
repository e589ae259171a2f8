//! Scoped database sessions over pluggable engines, in blocking and async
//! flavors.
//!
//! A manager builds the connection URL from a [`ConnectionConfig`], asks a
//! backend for an engine, and hands out sessions through scopes that commit
//! on success, roll back on failure and always close the session.

mod config;
mod echo;
mod engine;
mod error;
mod manager;
mod pool;
mod scope;
mod session;

pub use config::ConnectionConfig;
pub use engine::{
    AsyncBackend, AsyncEngine, AsyncSessionFactory, Backend, Engine, SessionFactory,
    ensure_supported,
};
pub use error::{BoxError, Error, Result, TransactionOp};
pub use manager::{AsyncDbManager, AsyncEngineManager, DbManager, EngineManager};
pub use pool::{DEFAULT_MAX_IDLE, IdlePool};
pub use scope::{AsyncSessionScope, SessionScope};
pub use session::{AsyncSession, Row, Session, nested, nested_async};
