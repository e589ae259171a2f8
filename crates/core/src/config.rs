use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const REDACTED_PASSWORD: &str = "***";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub dialect: String,
    pub driver: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub echo: bool,
}

impl ConnectionConfig {
    /// `{dialect}+{driver}://{user}:{password}@{host}:{port}/{database}`, verbatim.
    /// Credentials are not percent-encoded.
    #[must_use]
    pub fn url(&self) -> String {
        self.url_with_password(&self.password)
    }

    #[must_use]
    pub fn redacted_url(&self) -> String {
        self.url_with_password(REDACTED_PASSWORD)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|source| Error::Config {
            origin: "yaml input".to_string(),
            source: source.into(),
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let origin = format!("`{}`", path.display());
        let raw = fs::read_to_string(path).map_err(|source| Error::Config {
            origin: origin.clone(),
            source: source.into(),
        })?;
        serde_yaml::from_str(&raw).map_err(|source| Error::Config {
            origin,
            source: source.into(),
        })
    }

    fn url_with_password(&self, password: &str) -> String {
        format!(
            "{}+{}://{}:{}@{}:{}/{}",
            self.dialect, self.driver, self.user, password, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("dialect", &self.dialect)
            .field("driver", &self.driver)
            .field("user", &self.user)
            .field("password", &REDACTED_PASSWORD)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("echo", &self.echo)
            .finish()
    }
}
