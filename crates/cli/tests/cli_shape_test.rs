use std::process::Command;

fn run_scopedb(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_scopedb"))
        .args(args)
        .output()
        .unwrap_or_else(|error| panic!("failed to run scopedb: {error}"))
}

#[test]
fn usage_lists_default_enabled_dialects_only() {
    let output = run_scopedb(&[]);

    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage: scopedb <COMMAND>"));
    assert!(stderr.contains("postgres"));
    assert!(stderr.contains("mysql"));
    assert!(stderr.contains("sqlite"));
    assert!(stderr.contains("config"));
    assert!(!stderr.contains("\n  mssql"));
}

#[cfg(not(feature = "mssql"))]
#[test]
fn rejects_disabled_mssql_subcommand_by_default() {
    let output = run_scopedb(&["mssql"]);

    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand 'mssql'"));
}

#[cfg(feature = "postgres")]
#[test]
fn postgres_help_lists_connection_and_run_flags() {
    let output = run_scopedb(&["postgres", "--help"]);

    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in [
        "--host",
        "--port",
        "--user",
        "--password",
        "--driver",
        "--execute",
        "--rollback",
        "--echo",
        "--print-url",
        "<DATABASE>",
    ] {
        assert!(stdout.contains(flag), "missing {flag} in: {stdout}");
    }
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_help_uses_database_path_and_excludes_network_flags() {
    let output = run_scopedb(&["sqlite", "--help"]);

    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<DATABASE>"));
    assert!(stdout.contains("--driver"));
    assert!(!stdout.contains("--host"));
    assert!(!stdout.contains("--port"));
    assert!(!stdout.contains("--user"));
    assert!(!stdout.contains("--password"));
}

#[cfg(feature = "sqlite")]
#[test]
fn statements_are_required_unless_printing_url() {
    let output = run_scopedb(&["sqlite", "app.db"]);

    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--execute <SQL>"), "{stderr}");
}
