use std::{
    io,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use scopedb_core::{
    AsyncBackend, AsyncEngine, AsyncSession, Backend, ConnectionConfig, Engine, Error, Result,
    Row, Session, TransactionOp,
};

pub const RECORDING_DIALECT: &str = "postgresql";
pub const RECORDING_DRIVERS: &[&str] = &["recording", "asyncpg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CreateEngine { url: String },
    Open { session: usize },
    Execute { session: usize, sql: String },
    Query { session: usize, sql: String },
    Commit { session: usize },
    Rollback { session: usize },
    Close { session: usize },
    Dispose,
}

#[derive(Debug, Default)]
struct Failures {
    connect: Option<String>,
    statement: Option<(String, String)>,
    commit: Option<String>,
    rollback: Option<String>,
    close: Option<String>,
}

#[derive(Debug, Default)]
struct RecorderState {
    events: Vec<Event>,
    failures: Failures,
    rows: Vec<Row>,
}

/// Shared journal of everything the recording engine and its sessions did.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<RecorderState>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    #[must_use]
    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.lock().events.iter().filter(|event| predicate(event)).count()
    }

    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Commit { .. }))
    }

    #[must_use]
    pub fn rollback_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Rollback { .. }))
    }

    #[must_use]
    pub fn close_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Close { .. }))
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Open { .. }))
    }

    #[must_use]
    pub fn dispose_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Dispose))
    }

    /// Events of one session, in order.
    #[must_use]
    pub fn session_events(&self, session: usize) -> Vec<Event> {
        self.lock()
            .events
            .iter()
            .filter(|event| event_session(event) == Some(session))
            .cloned()
            .collect()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    pub fn set_rows(&self, rows: Vec<Row>) {
        self.lock().rows = rows;
    }

    pub fn fail_connect(&self, message: impl Into<String>) {
        self.lock().failures.connect = Some(message.into());
    }

    pub fn fail_on_sql(&self, sql: impl Into<String>, message: impl Into<String>) {
        self.lock().failures.statement = Some((sql.into(), message.into()));
    }

    pub fn fail_commit(&self, message: impl Into<String>) {
        self.lock().failures.commit = Some(message.into());
    }

    pub fn fail_rollback(&self, message: impl Into<String>) {
        self.lock().failures.rollback = Some(message.into());
    }

    pub fn fail_close(&self, message: impl Into<String>) {
        self.lock().failures.close = Some(message.into());
    }

    pub fn clear_failures(&self) {
        self.lock().failures = Failures::default();
    }

    fn record(&self, event: Event) {
        self.lock().events.push(event);
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn event_session(event: &Event) -> Option<usize> {
    match event {
        Event::Open { session }
        | Event::Execute { session, .. }
        | Event::Query { session, .. }
        | Event::Commit { session }
        | Event::Rollback { session }
        | Event::Close { session } => Some(*session),
        Event::CreateEngine { .. } | Event::Dispose => None,
    }
}

/// Backend serving both flavors from a [`Recorder`].
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    recorder: Recorder,
    dialect: &'static str,
    drivers: &'static [&'static str],
}

impl RecordingBackend {
    #[must_use]
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            dialect: RECORDING_DIALECT,
            drivers: RECORDING_DRIVERS,
        }
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: &'static str, drivers: &'static [&'static str]) -> Self {
        self.dialect = dialect;
        self.drivers = drivers;
        self
    }

    fn create(&self, config: &ConnectionConfig) -> Result<RecordingEngine> {
        if let Some(message) = self.recorder.lock().failures.connect.clone() {
            return Err(Error::connect(config.redacted_url(), io::Error::other(message)));
        }
        self.recorder.record(Event::CreateEngine { url: config.url() });
        Ok(RecordingEngine::new(self.recorder.clone()))
    }
}

impl Backend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn dialect(&self) -> &'static str {
        self.dialect
    }

    fn drivers(&self) -> &'static [&'static str] {
        self.drivers
    }

    fn create_engine(&self, config: &ConnectionConfig) -> Result<Box<dyn Engine>> {
        Ok(Box::new(self.create(config)?))
    }
}

#[async_trait]
impl AsyncBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn dialect(&self) -> &'static str {
        self.dialect
    }

    fn drivers(&self) -> &'static [&'static str] {
        self.drivers
    }

    async fn create_engine(&self, config: &ConnectionConfig) -> Result<Box<dyn AsyncEngine>> {
        Ok(Box::new(self.create(config)?))
    }
}

#[derive(Debug)]
pub struct RecordingEngine {
    recorder: Recorder,
    opened: AtomicUsize,
    disposed: AtomicBool,
}

impl RecordingEngine {
    #[must_use]
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            opened: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    fn open(&self) -> Result<RecordingSession> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(Error::Disposed);
        }
        let id = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder.record(Event::Open { session: id });
        Ok(RecordingSession {
            id,
            recorder: self.recorder.clone(),
            closed: false,
        })
    }

    fn dispose_pool(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.recorder.record(Event::Dispose);
        }
    }
}

impl Engine for RecordingEngine {
    fn open_session(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(self.open()?))
    }

    fn dispose(&self) -> Result<()> {
        self.dispose_pool();
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AsyncEngine for RecordingEngine {
    async fn open_session(&self) -> Result<Box<dyn AsyncSession>> {
        Ok(Box::new(self.open()?))
    }

    async fn dispose(&self) -> Result<()> {
        self.dispose_pool();
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct RecordingSession {
    id: usize,
    recorder: Recorder,
    closed: bool,
}

impl RecordingSession {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    fn statement_failure(&self, sql: &str) -> Option<Error> {
        let state = self.recorder.lock();
        let (failing_sql, message) = state.failures.statement.as_ref()?;
        (failing_sql == sql).then(|| Error::statement(sql, io::Error::other(message.clone())))
    }

    fn transaction_failure(&self, operation: TransactionOp) -> Option<Error> {
        let state = self.recorder.lock();
        let message = match operation {
            TransactionOp::Commit => state.failures.commit.as_ref(),
            TransactionOp::Rollback => state.failures.rollback.as_ref(),
            TransactionOp::Close => state.failures.close.as_ref(),
            TransactionOp::Begin | TransactionOp::Savepoint => None,
        }?;
        Some(Error::transaction(operation, io::Error::other(message.clone())))
    }

    fn run_execute(&mut self, sql: &str) -> Result<u64> {
        self.ensure_open()?;
        if let Some(error) = self.statement_failure(sql) {
            return Err(error);
        }
        self.recorder.record(Event::Execute {
            session: self.id,
            sql: sql.to_string(),
        });
        Ok(1)
    }

    fn run_query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.ensure_open()?;
        if let Some(error) = self.statement_failure(sql) {
            return Err(error);
        }
        self.recorder.record(Event::Query {
            session: self.id,
            sql: sql.to_string(),
        });
        Ok(self.recorder.lock().rows.clone())
    }

    fn run_commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.recorder.record(Event::Commit { session: self.id });
        self.transaction_failure(TransactionOp::Commit).map_or(Ok(()), Err)
    }

    fn run_rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.recorder.record(Event::Rollback { session: self.id });
        self.transaction_failure(TransactionOp::Rollback).map_or(Ok(()), Err)
    }

    fn run_close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.recorder.record(Event::Close { session: self.id });
        self.transaction_failure(TransactionOp::Close).map_or(Ok(()), Err)
    }
}

impl Session for RecordingSession {
    fn execute(&mut self, sql: &str) -> Result<u64> {
        self.run_execute(sql)
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.run_query(sql)
    }

    fn commit(&mut self) -> Result<()> {
        self.run_commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.run_rollback()
    }

    fn close(&mut self) -> Result<()> {
        self.run_close()
    }
}

#[async_trait]
impl AsyncSession for RecordingSession {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.run_execute(sql)
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.run_query(sql)
    }

    async fn commit(&mut self) -> Result<()> {
        self.run_commit()
    }

    async fn rollback(&mut self) -> Result<()> {
        self.run_rollback()
    }

    async fn close(&mut self) -> Result<()> {
        self.run_close()
    }
}
