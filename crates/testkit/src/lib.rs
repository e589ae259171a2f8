use scopedb_core::ConnectionConfig;

mod recording;
mod yaml_runner;

pub use recording::{
    Event, RECORDING_DIALECT, RECORDING_DRIVERS, Recorder, RecordingBackend, RecordingEngine,
    RecordingSession,
};
pub use yaml_runner::{
    TestCase, TestResult, Verification, load_test_cases_from_str, render_error_chain,
    run_async_test, run_test,
};

/// Config accepted by [`RecordingBackend::new`].
pub fn recording_config() -> ConnectionConfig {
    ConnectionConfig {
        dialect: RECORDING_DIALECT.to_string(),
        driver: "recording".to_string(),
        user: "u".to_string(),
        password: "p".to_string(),
        host: "localhost".to_string(),
        port: 5432,
        database: "test".to_string(),
        echo: false,
    }
}
