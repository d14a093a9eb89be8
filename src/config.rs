use std::{net::SocketAddr, time::Duration};

use clap::Args;
use thiserror::Error;

use crate::{
    constants::{DEFAULT_BIND_ADDRESS, DEFAULT_MAX_CONNECTIONS, DEFAULT_WAIT_INTERVAL_MS},
    token::{TokenConfigError, TokenSigner},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SECRET_KEY is invalid: {0}")]
    Secret(#[from] TokenConfigError),
    #[error("DB_MAX_CONNECTIONS must be at least 1")]
    NoConnections,
}

#[derive(Args, Debug, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Size of the connection pool
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::NoConnections);
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct WaitConfig {
    /// Give up after this many failed attempts (retries forever by default)
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Pause between attempts in milliseconds
    #[arg(long, default_value = DEFAULT_WAIT_INTERVAL_MS)]
    pub interval_ms: u64,
}

impl WaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Address the API listens on
    #[arg(long, env = "RECIPES_BIND", default_value = DEFAULT_BIND_ADDRESS)]
    pub bind: SocketAddr,

    /// Server secret used to sign token digests
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,
}

impl ServerConfig {
    pub fn signer(&self) -> Result<TokenSigner, ConfigError> {
        Ok(TokenSigner::new(&self.secret_key)?)
    }
}
