use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::{AsyncSession, Error, Result, Row, Session};

/// Scoped acquisition of a blocking session.
///
/// Finishing the scope commits or rolls back, then closes the session. The
/// session is closed exactly once whichever way the scope ends; dropping an
/// unfinished scope (an early `?` return or a panic) rolls back.
pub struct SessionScope {
    session: Option<Box<dyn Session>>,
}

impl SessionScope {
    #[must_use]
    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&mut self) -> Result<&mut dyn Session> {
        match &mut self.session {
            Some(session) => Ok(session.as_mut()),
            None => Err(Error::SessionClosed),
        }
    }

    pub fn execute(&mut self, sql: &str) -> Result<u64> {
        self.session()?.execute(sql)
    }

    pub fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.session()?.query(sql)
    }

    pub fn commit(mut self) -> Result<()> {
        self.complete_with_commit()
    }

    pub fn rollback(mut self) -> Result<()> {
        self.complete_with_rollback()
    }

    /// Commits on `Ok`, rolls back on `Err`. The caller's error comes back
    /// unchanged; a commit failure is converted into `E`.
    pub fn finish<T, E>(mut self, outcome: std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: From<Error>,
    {
        match outcome {
            Ok(value) => {
                self.complete_with_commit()?;
                Ok(value)
            }
            Err(error) => {
                if let Err(cleanup_error) = self.complete_with_rollback() {
                    warn!(error = %cleanup_error, "cleanup after failed session block failed");
                }
                Err(error)
            }
        }
    }

    fn complete_with_commit(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        let committed = session.commit();
        if let Err(commit_error) = &committed {
            debug!(error = %commit_error, "commit failed; rolling back");
            if let Err(rollback_error) = session.rollback() {
                warn!(error = %rollback_error, "rollback after failed commit failed");
            }
        }
        let closed = close_session(session.as_mut());

        committed.and(closed)
    }

    fn complete_with_rollback(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        let rolled_back = session.rollback();
        let closed = close_session(session.as_mut());

        rolled_back.and(closed)
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        if self.session.is_none() {
            return;
        }
        debug!("session scope dropped before finishing; rolling back");
        if let Err(error) = self.complete_with_rollback() {
            warn!(error = %error, "rollback of abandoned session scope failed");
        }
    }
}

fn close_session(session: &mut dyn Session) -> Result<()> {
    let closed = session.close();
    if let Err(error) = &closed {
        warn!(error = %error, "session close failed");
    }
    closed
}

/// Scoped acquisition of an async session.
///
/// Same guarantees as [`SessionScope`] when finished with `.await`. A scope
/// dropped unfinished spawns its rollback and close on the current tokio
/// runtime; outside a runtime the session is dropped as is.
pub struct AsyncSessionScope {
    session: Option<Box<dyn AsyncSession>>,
}

impl AsyncSessionScope {
    #[must_use]
    pub fn new(session: Box<dyn AsyncSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&mut self) -> Result<&mut dyn AsyncSession> {
        match &mut self.session {
            Some(session) => Ok(session.as_mut()),
            None => Err(Error::SessionClosed),
        }
    }

    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.session()?.execute(sql).await
    }

    pub async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.session()?.query(sql).await
    }

    pub async fn commit(mut self) -> Result<()> {
        self.complete_with_commit().await
    }

    pub async fn rollback(mut self) -> Result<()> {
        self.complete_with_rollback().await
    }

    pub async fn finish<T, E>(
        mut self,
        outcome: std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<Error>,
    {
        match outcome {
            Ok(value) => {
                self.complete_with_commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(cleanup_error) = self.complete_with_rollback().await {
                    warn!(error = %cleanup_error, "cleanup after failed session block failed");
                }
                Err(error)
            }
        }
    }

    async fn complete_with_commit(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        let committed = session.commit().await;
        if let Err(commit_error) = &committed {
            debug!(error = %commit_error, "commit failed; rolling back");
            if let Err(rollback_error) = session.rollback().await {
                warn!(error = %rollback_error, "rollback after failed commit failed");
            }
        }
        let closed = close_async_session(session.as_mut()).await;

        committed.and(closed)
    }

    async fn complete_with_rollback(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        let rolled_back = session.rollback().await;
        let closed = close_async_session(session.as_mut()).await;

        rolled_back.and(closed)
    }
}

impl Drop for AsyncSessionScope {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        match Handle::try_current() {
            Ok(handle) => {
                debug!("async session scope dropped before finishing; spawning rollback");
                handle.spawn(async move {
                    if let Err(error) = session.rollback().await {
                        warn!(error = %error, "rollback of abandoned session scope failed");
                    }
                    let _ = close_async_session(session.as_mut()).await;
                });
            }
            Err(_) => {
                warn!(
                    "async session scope dropped outside a tokio runtime; session not rolled back"
                );
            }
        }
    }
}

async fn close_async_session(session: &mut dyn AsyncSession) -> Result<()> {
    let closed = session.close().await;
    if let Err(error) = &closed {
        warn!(error = %error, "session close failed");
    }
    closed
}
