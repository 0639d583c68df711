use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::TimeDelta;

/// Placeholder JWT secret shipped as the default. Usable, but warned about.
pub const PLACEHOLDER_SECRET: &str = "tally-secret-key-change-in-production";

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: TimeDelta,
    pub default_username: String,
    pub default_password: String,
    pub cors_origins: Vec<String>,
    /// Built frontend to serve for non-API paths. `None` disables it.
    pub static_dir: Option<PathBuf>,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so it can be tested without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| lookup(k).filter(|v| !v.is_empty()))
        };

        let port: u16 = var(&["TALLY_PORT", "PORT"])
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("TALLY_PORT must be a port number")?;

        let expire_hours: i64 = var(&["TALLY_JWT_EXPIRE_HOURS"])
            .unwrap_or_else(|| "168".into()) // 7 days
            .parse()
            .context("TALLY_JWT_EXPIRE_HOURS must be a whole number of hours")?;
        let token_ttl = TimeDelta::try_hours(expire_hours)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .context("TALLY_JWT_EXPIRE_HOURS must be positive")?;

        let cors_origins = var(&["TALLY_CORS_ORIGINS"])
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_json = var(&["TALLY_LOG_JSON"])
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            host: var(&["TALLY_HOST"]).unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var(&["TALLY_DB_PATH"])
                .unwrap_or_else(|| "./data.db".into())
                .into(),
            jwt_secret: var(&["TALLY_JWT_SECRET", "JWT_SECRET"])
                .unwrap_or_else(|| PLACEHOLDER_SECRET.into()),
            token_ttl,
            default_username: var(&["TALLY_DEFAULT_USERNAME"]).unwrap_or_else(|| "admin".into()),
            default_password: var(&["TALLY_DEFAULT_PASSWORD"])
                .unwrap_or_else(|| "password".into()),
            cors_origins,
            static_dir: var(&["TALLY_STATIC_DIR"]).map(PathBuf::from),
            log_json,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.jwt_secret == PLACEHOLDER_SECRET
    }
}
