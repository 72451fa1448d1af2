use anyhow::{anyhow, Context};
use std::env;

/// Runtime settings read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub database_max_connections: u32,
    /// Overdue sweep interval of the worker binary.
    pub worker_poll_interval_seconds: u64,
}

impl Config {
    /// Loads the configuration from the process environment.
    ///
    /// `DATABASE_URL` and `JWT_SECRET` are required. `SERVER_HOST`,
    /// `SERVER_PORT`, `DATABASE_MAX_CONNECTIONS` and
    /// `WORKER_POLL_INTERVAL_SECONDS` fall back to defaults.
    ///
    /// # Returns
    ///
    /// Returns the parsed `Config`, or an error naming the missing or
    /// malformed variable.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;
        let jwt_secret = lookup("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or(&lookup, "SERVER_PORT", 3000)?;
        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;
        let worker_poll_interval_seconds = parse_or(&lookup, "WORKER_POLL_INTERVAL_SECONDS", 60)?;

        Ok(Self {
            database_url,
            server_host,
            server_port,
            jwt_secret,
            database_max_connections,
            worker_poll_interval_seconds,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/tradedesk"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.worker_poll_interval_seconds, 60);
    }

    #[test]
    fn test_missing_secret_and_bad_port() {
        assert!(config_from(&[("DATABASE_URL", "postgres://localhost/tradedesk")]).is_err());

        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/tradedesk"),
            ("JWT_SECRET", "s"),
            ("SERVER_PORT", "http"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }
}
