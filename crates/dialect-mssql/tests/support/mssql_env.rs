use scopedb_core::ConnectionConfig;

pub fn live_config() -> Option<ConnectionConfig> {
    if std::env::var("SCOPEDB_MSSQL_ENABLE_IGNORED").as_deref() != Ok("1") {
        return None;
    }

    let host = std::env::var("SCOPEDB_MSSQL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("SCOPEDB_MSSQL_PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(1433);
    let user = std::env::var("SCOPEDB_MSSQL_USER").unwrap_or_else(|_| "sa".to_string());
    let password =
        std::env::var("SCOPEDB_MSSQL_PASSWORD").unwrap_or_else(|_| "Passw0rd!".to_string());
    let database =
        std::env::var("SCOPEDB_MSSQL_DATABASE").unwrap_or_else(|_| "master".to_string());

    Some(ConnectionConfig {
        dialect: "mssql".to_string(),
        driver: "tiberius".to_string(),
        user,
        password,
        host,
        port,
        database,
        echo: false,
    })
}

pub const SCENARIOS: &str = r#"
commits_across_statements:
  setup:
    - IF OBJECT_ID('dbo.scopedb_accounts') IS NOT NULL DROP TABLE dbo.scopedb_accounts
    - CREATE TABLE dbo.scopedb_accounts (id INT PRIMARY KEY, owner NVARCHAR(64) NOT NULL)
  statements:
    - INSERT INTO dbo.scopedb_accounts VALUES (1, N'alice')
    - INSERT INTO dbo.scopedb_accounts VALUES (2, N'bob')
  verify:
    query: SELECT id, owner FROM dbo.scopedb_accounts ORDER BY id
    rows:
      - ["1", alice]
      - ["2", bob]
duplicate_key_rolls_back_whole_scope:
  setup:
    - IF OBJECT_ID('dbo.scopedb_accounts') IS NOT NULL DROP TABLE dbo.scopedb_accounts
    - CREATE TABLE dbo.scopedb_accounts (id INT PRIMARY KEY, owner NVARCHAR(64) NOT NULL)
    - INSERT INTO dbo.scopedb_accounts VALUES (1, N'alice')
  statements:
    - INSERT INTO dbo.scopedb_accounts VALUES (2, N'bob')
    - INSERT INTO dbo.scopedb_accounts VALUES (1, N'mallory')
  error: PRIMARY KEY
  verify:
    query: SELECT owner FROM dbo.scopedb_accounts ORDER BY id
    rows:
      - [alice]
"#;
