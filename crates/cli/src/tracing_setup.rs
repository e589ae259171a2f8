use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";
const ECHO_FILTER: &str = "warn,scopedb::echo=info";
const DEBUG_FILTER: &str = "debug";

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over
/// the flags.
pub(crate) fn init_tracing(echo: bool, debug: bool) {
    let fallback = match (debug, echo) {
        (true, _) => DEBUG_FILTER,
        (false, true) => ECHO_FILTER,
        (false, false) => DEFAULT_FILTER,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug || echo)
        .compact()
        .try_init();
}
