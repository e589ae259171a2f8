use scopedb_core::ConnectionConfig;

/// Connection settings for the opt-in live tests.
pub fn live_config(driver: &str) -> Option<ConnectionConfig> {
    if std::env::var("SCOPEDB_POSTGRES_ENABLE_IGNORED").as_deref() != Ok("1") {
        return None;
    }

    let host = std::env::var("SCOPEDB_POSTGRES_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("SCOPEDB_POSTGRES_PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(5432);
    let user = std::env::var("SCOPEDB_POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = std::env::var("SCOPEDB_POSTGRES_PASSWORD").unwrap_or_default();
    let database =
        std::env::var("SCOPEDB_POSTGRES_DATABASE").unwrap_or_else(|_| "postgres".to_string());

    Some(ConnectionConfig {
        dialect: "postgresql".to_string(),
        driver: driver.to_string(),
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
    - DROP TABLE IF EXISTS scopedb_accounts
    - CREATE TABLE scopedb_accounts (id integer PRIMARY KEY, owner text NOT NULL, balance numeric)
  statements:
    - INSERT INTO scopedb_accounts VALUES (1, 'alice', 10.50)
    - INSERT INTO scopedb_accounts VALUES (2, 'bob', NULL)
  verify:
    query: SELECT id, owner, balance FROM scopedb_accounts ORDER BY id
    rows:
      - ["1", alice, "10.50"]
      - ["2", bob, null]
duplicate_key_rolls_back_whole_scope:
  setup:
    - DROP TABLE IF EXISTS scopedb_accounts
    - CREATE TABLE scopedb_accounts (id integer PRIMARY KEY, owner text NOT NULL, balance numeric)
    - INSERT INTO scopedb_accounts VALUES (1, 'alice', 0)
  statements:
    - INSERT INTO scopedb_accounts VALUES (2, 'bob', 0)
    - INSERT INTO scopedb_accounts VALUES (1, 'mallory', 0)
  error: duplicate key value
  verify:
    query: SELECT owner FROM scopedb_accounts ORDER BY id
    rows:
      - [alice]
"#;
