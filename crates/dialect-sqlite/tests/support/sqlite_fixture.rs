use scopedb_core::{ConnectionConfig, DbManager, EngineManager};
use scopedb_dialect_sqlite::SqliteBackend;
use tempfile::TempDir;

pub struct SqliteFixture {
    // Keeps the database file alive for the test's duration.
    _dir: TempDir,
    pub manager: EngineManager,
}

pub fn sqlite_config(database: &str) -> ConnectionConfig {
    ConnectionConfig {
        dialect: "sqlite".to_string(),
        driver: "rusqlite".to_string(),
        user: String::new(),
        password: String::new(),
        host: "localhost".to_string(),
        port: 0,
        database: database.to_string(),
        echo: false,
    }
}

pub fn users_database() -> SqliteFixture {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("app.db");
    let manager = EngineManager::new(
        &SqliteBackend,
        sqlite_config(path.to_str().expect("temp path should be utf-8")),
    )
    .expect("sqlite manager should initialize");

    let mut scope = manager.get_db().expect("setup scope should open");
    scope
        .execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .expect("users table should be created");
    scope.commit().expect("setup should commit");

    SqliteFixture { _dir: dir, manager }
}

#[allow(dead_code)]
pub fn user_names(manager: &dyn DbManager) -> Vec<Option<String>> {
    let mut scope = manager.get_db().expect("read scope should open");
    let rows = scope
        .query("SELECT name FROM users ORDER BY id")
        .expect("users should be readable");
    scope.commit().expect("read scope should commit");
    rows.into_iter()
        .map(|row| row.into_values().into_iter().next().flatten())
        .collect()
}
