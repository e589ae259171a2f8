use std::io;

use miette::Report;

const SESSION_CONTEXT: &str = "while running scoped session";
const CONFIG_CONTEXT: &str = "while loading connection config";
const RUNTIME_CONTEXT: &str = "while starting async runtime";
const OUTPUT_CONTEXT: &str = "while writing results";

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    LoadConfig(scopedb_core::Error),
    UnknownDialect { dialect: String },
    Runtime(io::Error),
    Output(io::Error),
    Core(scopedb_core::Error),
}

impl From<scopedb_core::Error> for CliError {
    fn from(value: scopedb_core::Error) -> Self {
        Self::Core(value)
    }
}

pub(crate) fn render_runtime_error(error: CliError) -> String {
    match error {
        CliError::LoadConfig(source) => {
            let category = source.category();
            let report = report_with_context(source, CONFIG_CONTEXT);
            format!("[{category}] {report}")
        }
        CliError::UnknownDialect { dialect } => {
            format!("[config] {}", unknown_dialect_message(&dialect))
        }
        CliError::Runtime(source) => {
            let report = report_with_context(source, RUNTIME_CONTEXT);
            format!("[io] {report}")
        }
        CliError::Output(source) => {
            let report = report_with_context(source, OUTPUT_CONTEXT);
            format!("[io] {report}")
        }
        CliError::Core(source) => {
            let category = source.category();
            let report = report_with_context(source, SESSION_CONTEXT);
            format!("[{category}] {report}")
        }
    }
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let anyhow_error = anyhow::Error::new(source).context(context.into());
    miette::miette!("{anyhow_error:#}")
}

fn unknown_dialect_message(dialect: &str) -> String {
    let mut enabled: Vec<&str> = Vec::new();
    #[cfg(feature = "postgres")]
    enabled.push(scopedb_dialect_postgres::DIALECT);
    #[cfg(feature = "mysql")]
    enabled.push(scopedb_dialect_mysql::DIALECT);
    #[cfg(feature = "sqlite")]
    enabled.push(scopedb_dialect_sqlite::DIALECT);
    #[cfg(feature = "mssql")]
    enabled.push(scopedb_dialect_mssql::DIALECT);

    if enabled.is_empty() {
        return format!(
            "dialect `{dialect}` is not available: no dialect features are enabled for this build"
        );
    }
    format!(
        "dialect `{dialect}` is not available in this build; enabled dialects: {}",
        enabled.join(", ")
    )
}
