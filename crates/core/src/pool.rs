use std::{
    mem,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{Error, Result};

pub const DEFAULT_MAX_IDLE: usize = 5;

/// Stack of idle physical connections owned by an engine.
///
/// Opening new connections is left to the engine; the pool only keeps the
/// ones handed back by closed sessions. Once disposed it refuses checkouts
/// and drops anything checked in.
#[derive(Debug)]
pub struct IdlePool<C> {
    idle: Mutex<Vec<C>>,
    max_idle: usize,
    disposed: AtomicBool,
}

impl<C> Default for IdlePool<C> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

impl<C> IdlePool<C> {
    #[must_use]
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            disposed: AtomicBool::new(false),
        }
    }

    /// Most recently returned idle connection, or `None` when the caller has
    /// to open a new one.
    pub fn checkout(&self) -> Result<Option<C>> {
        let mut idle = self.lock_idle();
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        Ok(idle.pop())
    }

    /// Returns `false` when the connection was dropped instead of kept.
    pub fn checkin(&self, connection: C) -> bool {
        let mut idle = self.lock_idle();
        if self.is_disposed() || idle.len() >= self.max_idle {
            return false;
        }
        idle.push(connection);
        true
    }

    /// Drops every idle connection and returns how many were dropped.
    pub fn dispose(&self) -> usize {
        let mut idle = self.lock_idle();
        self.disposed.store(true, Ordering::SeqCst);
        mem::take(&mut *idle).len()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<C>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
