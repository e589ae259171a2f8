use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use scopedb_core::ConnectionConfig;

mod backends;
mod error_presentation;
mod output;
mod runner;
mod tracing_setup;

use error_presentation::{CliError, CliResult, render_runtime_error};

#[derive(Debug, Parser)]
#[command(
    name = "scopedb",
    version,
    about = "Run SQL statements inside one scoped database session"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to PostgreSQL
    #[cfg(feature = "postgres")]
    Postgres(NetworkArgs),
    /// Connect to MySQL
    #[cfg(feature = "mysql")]
    Mysql(NetworkArgs),
    /// Open a SQLite database file
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteArgs),
    /// Connect to SQL Server
    #[cfg(feature = "mssql")]
    Mssql(NetworkArgs),
    /// Read the connection settings from a YAML file
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct NetworkArgs {
    /// Database name
    database: String,
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Defaults to the dialect's standard port
    #[arg(long)]
    port: Option<u16>,
    /// Defaults to the dialect's administrative user
    #[arg(long)]
    user: Option<String>,
    #[arg(long, default_value = "")]
    password: String,
    /// Client driver; async drivers (e.g. sqlx) run on a tokio runtime
    #[arg(long)]
    driver: Option<String>,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Args)]
struct SqliteArgs {
    /// Path to the database file
    database: String,
    #[arg(long, default_value = "rusqlite")]
    driver: String,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// YAML file with dialect, driver, user, password, host, port, database and echo
    file: PathBuf,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    /// Statement to run; repeat to run several in the same session
    #[arg(
        short = 'e',
        long = "execute",
        value_name = "SQL",
        required_unless_present = "print_url"
    )]
    pub(crate) execute: Vec<String>,
    /// Roll the session back instead of committing it
    #[arg(long)]
    pub(crate) rollback: bool,
    /// Log every statement at INFO on the `scopedb::echo` target
    #[arg(long)]
    pub(crate) echo: bool,
    /// Print the connection URL with the password redacted and exit
    #[arg(long)]
    pub(crate) print_url: bool,
    /// Enable debug logging unless RUST_LOG is set
    #[arg(long)]
    pub(crate) debug: bool,
}

struct NetworkDefaults {
    dialect: &'static str,
    driver: &'static str,
    port: u16,
    user: &'static str,
}

impl NetworkArgs {
    fn into_parts(self, defaults: &NetworkDefaults) -> (ConnectionConfig, RunArgs) {
        let config = ConnectionConfig {
            dialect: defaults.dialect.to_string(),
            driver: self.driver.unwrap_or_else(|| defaults.driver.to_string()),
            user: self.user.unwrap_or_else(|| defaults.user.to_string()),
            password: self.password,
            host: self.host,
            port: self.port.unwrap_or(defaults.port),
            database: self.database,
            echo: self.run.echo,
        };
        (config, self.run)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", render_runtime_error(error));
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> CliResult<()> {
    let (mut config, args) = connection_parts(command)?;
    config.echo |= args.echo;
    tracing_setup::init_tracing(config.echo, args.debug);

    if args.print_url {
        output::write_stdout(&format!("{}\n", config.redacted_url()))?;
        return Ok(());
    }

    let outputs = match backends::select(&config)? {
        backends::Selected::Blocking(backend) => {
            runner::run_blocking(backend.as_ref(), config, &args)?
        }
        backends::Selected::Async(backend) => runner::run_async(backend, config, &args)?,
    };
    output::write_stdout(&output::render(&outputs))
}

fn connection_parts(command: Command) -> CliResult<(ConnectionConfig, RunArgs)> {
    let parts = match command {
        #[cfg(feature = "postgres")]
        Command::Postgres(args) => args.into_parts(&NetworkDefaults {
            dialect: scopedb_dialect_postgres::DIALECT,
            driver: "postgres",
            port: 5432,
            user: "postgres",
        }),
        #[cfg(feature = "mysql")]
        Command::Mysql(args) => args.into_parts(&NetworkDefaults {
            dialect: scopedb_dialect_mysql::DIALECT,
            driver: "mysql",
            port: 3306,
            user: "root",
        }),
        #[cfg(feature = "mssql")]
        Command::Mssql(args) => args.into_parts(&NetworkDefaults {
            dialect: scopedb_dialect_mssql::DIALECT,
            driver: "tiberius",
            port: 1433,
            user: "sa",
        }),
        #[cfg(feature = "sqlite")]
        Command::Sqlite(args) => (
            ConnectionConfig {
                dialect: scopedb_dialect_sqlite::DIALECT.to_string(),
                driver: args.driver,
                user: String::new(),
                password: String::new(),
                host: "localhost".to_string(),
                port: 0,
                database: args.database,
                echo: args.run.echo,
            },
            args.run,
        ),
        Command::Config(args) => {
            let config =
                ConnectionConfig::from_yaml_file(&args.file).map_err(CliError::LoadConfig)?;
            (config, args.run)
        }
    };
    Ok(parts)
}
