use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

const DEFAULT_RAWG_BASE_URL: &str = "https://api.rawg.io/api";
/// One year.
const MAX_JWT_TTL_MINUTES: i64 = 60 * 24 * 365;
const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Settings for the RAWG proxy.
#[derive(Debug, Clone, Deserialize)]
pub struct RawgConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl RawgConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub rawg: RawgConfig,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);

        let database_url = var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None => bail!("JWT_SECRET is not set; refusing to start without a signing key"),
        };

        let ttl_minutes: i64 = parse_or(var("JWT_TTL_MINUTES"), "JWT_TTL_MINUTES", 60)?;
        if !(1..=MAX_JWT_TTL_MINUTES).contains(&ttl_minutes) {
            bail!("JWT_TTL_MINUTES must be between 1 and {MAX_JWT_TTL_MINUTES}, got {ttl_minutes}");
        }
        let jwt = JwtConfig {
            secret,
            ttl_minutes,
        };
        let rawg = RawgConfig {
            api_key: var("RAWG_API_KEY"),
            base_url: var("RAWG_BASE_URL")
                .unwrap_or_else(|| DEFAULT_RAWG_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: parse_or(var("RAWG_TIMEOUT_SECS"), "RAWG_TIMEOUT_SECS", 30)?,
        };

        let cors_origins = match var("CORS_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None if environment.is_production() => {
                vec![var("FRONTEND_URL").unwrap_or_else(|| DEV_ORIGINS[0].into())]
            }
            None => DEV_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            environment,
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(var("APP_PORT"), "APP_PORT", 3001)?,
            database_url,
            database_max_connections: parse_or(
                var("DATABASE_MAX_CONNECTIONS"),
                "DATABASE_MAX_CONNECTIONS",
                10,
            )?,
            jwt,
            rawg,
            cors_origins,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key} value {v:?}: {e}")),
        None => Ok(default),
    }
}
