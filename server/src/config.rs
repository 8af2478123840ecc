//! Configuration management for the server.

use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL. Storage is in-memory when absent.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections
    pub db_max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidMaxConnections(value))?,
            Err(_) => 10,
        };

        Ok(Self {
            host,
            port,
            database_url,
            db_max_connections,
        })
    }

    /// Configuration for an in-memory server on `host:port`.
    pub fn in_memory(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            database_url: None,
            db_max_connections: 10,
        }
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid DB_MAX_CONNECTIONS value: {0}")]
    InvalidMaxConnections(String),
}
