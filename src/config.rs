// src/config.rs

use std::env;
use dotenvy::dotenv;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// Directory served under `/api/images`.
    pub images_dir: String,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            Err(_) => 3001,
        };

        Ok(Self {
            database_url,
            rust_log: var_or("RUST_LOG", "info"),
            host: var_or("HOST", "0.0.0.0"),
            port,
            cors_origin: var_or("CORS_ORIGIN", "http://localhost:3000"),
            images_dir: var_or("IMAGES_DIR", "data/images"),
            log_dir: var_or("LOG_DIR", "logs"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}
