pub mod database;

pub use database::{ConfigError, DatabaseConfig};
