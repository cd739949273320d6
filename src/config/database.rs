use std::env;

use tracing::warn;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("DATABASE_MAX_CONNECTIONS must be a positive integer, got '{0}'")]
    InvalidMaxConnections(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidMaxConnections(raw)),
            },
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        if !url.starts_with("sqlite:") {
            warn!(%url, "DATABASE_URL has no sqlite: scheme; sqlx will treat it as a file path");
        }

        Ok(Self {
            url,
            max_connections,
        })
    }

    /// Filesystem path of the database file, or `None` for in-memory databases.
    pub fn file_path(&self) -> Option<&str> {
        let path = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))
            .unwrap_or(&self.url);
        let path = path.split('?').next().unwrap_or(path);

        if path.is_empty() || path.contains(":memory:") {
            None
        } else {
            Some(path)
        }
    }
}
