use std::{collections::HashMap, env};

use family_portal::config::database::{ConfigError, DatabaseConfig, DEFAULT_MAX_CONNECTIONS};
use serial_test::serial;

#[derive(Default)]
struct EnvGuard {
    original: HashMap<String, Option<String>>,
}

impl EnvGuard {
    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.original
            .entry(key.to_string())
            .or_insert_with(|| env::var(key).ok());
        env::set_var(key, value.into());
    }

    fn remove(&mut self, key: &str) {
        self.original
            .entry(key.to_string())
            .or_insert_with(|| env::var(key).ok());
        env::remove_var(key);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.original.drain() {
            match value {
                Some(v) => env::set_var(&key, v),
                None => env::remove_var(&key),
            }
        }
    }
}

#[test]
#[serial]
fn database_url_is_required() {
    let mut env_guard = EnvGuard::default();
    env_guard.remove("DATABASE_URL");

    assert_eq!(
        DatabaseConfig::from_env(),
        Err(ConfigError::MissingDatabaseUrl)
    );

    env_guard.set("DATABASE_URL", "   ");
    assert_eq!(
        DatabaseConfig::from_env(),
        Err(ConfigError::MissingDatabaseUrl)
    );
}

#[test]
#[serial]
fn max_connections_defaults_when_unset() {
    let mut env_guard = EnvGuard::default();
    env_guard.set("DATABASE_URL", "sqlite://data/portal.db");
    env_guard.remove("DATABASE_MAX_CONNECTIONS");

    let config = DatabaseConfig::from_env().unwrap();
    assert_eq!(config.url, "sqlite://data/portal.db");
    assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    assert_eq!(config.file_path(), Some("data/portal.db"));
}

#[test]
#[serial]
fn max_connections_is_read_from_env() {
    let mut env_guard = EnvGuard::default();
    env_guard.set("DATABASE_URL", "sqlite::memory:");
    env_guard.set("DATABASE_MAX_CONNECTIONS", "2");

    let config = DatabaseConfig::from_env().unwrap();
    assert_eq!(config.max_connections, 2);
    assert_eq!(config.file_path(), None);
}

#[test]
#[serial]
fn invalid_max_connections_is_rejected() {
    let mut env_guard = EnvGuard::default();
    env_guard.set("DATABASE_URL", "sqlite://portal.db");

    env_guard.set("DATABASE_MAX_CONNECTIONS", "0");
    assert_eq!(
        DatabaseConfig::from_env(),
        Err(ConfigError::InvalidMaxConnections("0".to_string()))
    );

    env_guard.set("DATABASE_MAX_CONNECTIONS", "many");
    assert_eq!(
        DatabaseConfig::from_env(),
        Err(ConfigError::InvalidMaxConnections("many".to_string()))
    );
}
