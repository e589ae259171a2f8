use scopedb_core::ConnectionConfig;

pub fn live_config(driver: &str) -> Option<ConnectionConfig> {
    if std::env::var("SCOPEDB_MYSQL_ENABLE_IGNORED").as_deref() != Ok("1") {
        return None;
    }

    let host = std::env::var("SCOPEDB_MYSQL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("SCOPEDB_MYSQL_PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(3306);
    let user = std::env::var("SCOPEDB_MYSQL_USER").unwrap_or_else(|_| "root".to_string());
    let password = std::env::var("SCOPEDB_MYSQL_PASSWORD").unwrap_or_default();
    let database =
        std::env::var("SCOPEDB_MYSQL_DATABASE").unwrap_or_else(|_| "scopedb".to_string());

    Some(ConnectionConfig {
        dialect: "mysql".to_string(),
        driver: driver.to_string(),
        user,
        password,
        host,
        port,
        database,
        echo: false,
    })
}

// DDL commits implicitly in MySQL, so tables are created in `setup` only.
pub const SCENARIOS: &str = r#"
commits_across_statements:
  setup:
    - DROP TABLE IF EXISTS scopedb_accounts
    - CREATE TABLE scopedb_accounts (id INT PRIMARY KEY, owner VARCHAR(64) NOT NULL) ENGINE=InnoDB
  statements:
    - INSERT INTO scopedb_accounts VALUES (1, 'alice')
    - INSERT INTO scopedb_accounts VALUES (2, 'bob')
  verify:
    query: SELECT id, owner FROM scopedb_accounts ORDER BY id
    rows:
      - ["1", alice]
      - ["2", bob]
duplicate_key_rolls_back_whole_scope:
  setup:
    - DROP TABLE IF EXISTS scopedb_accounts
    - CREATE TABLE scopedb_accounts (id INT PRIMARY KEY, owner VARCHAR(64) NOT NULL) ENGINE=InnoDB
    - INSERT INTO scopedb_accounts VALUES (1, 'alice')
  statements:
    - INSERT INTO scopedb_accounts VALUES (2, 'bob')
    - INSERT INTO scopedb_accounts VALUES (1, 'mallory')
  error: Duplicate entry
  verify:
    query: SELECT owner FROM scopedb_accounts ORDER BY id
    rows:
      - [alice]
"#;
