use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgConnectOptions;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_S3_REGION: &str = "us-east-1";
const DEFAULT_COMPANY_NAME: &str = "Gutz";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Database settings are required; storage and mail credentials are optional
/// and only fail the requests that need them.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
    pub cors_allowed_origins: Vec<String>,
    pub external_call_timeout: Duration,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub connect_max_attempts: u32,
    pub connect_base_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub company_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so tests do not
    /// have to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?;
        let connect_max_attempts = parse_or(&lookup, "DB_CONNECT_MAX_ATTEMPTS", 10)?;
        let connect_base_delay =
            Duration::from_millis(parse_or(&lookup, "DB_CONNECT_BASE_DELAY_MS", 500)?);

        let database = match optional("DATABASE_URL") {
            Some(url) => DatabaseConfig {
                url: Some(url),
                host: String::new(),
                port: DEFAULT_DB_PORT,
                database: String::new(),
                user: String::new(),
                password: String::new(),
                max_connections,
                connect_max_attempts,
                connect_base_delay,
            },
            None => DatabaseConfig {
                url: None,
                host: require(&lookup, "DB_HOST")?,
                port: parse_or(&lookup, "DB_PORT", DEFAULT_DB_PORT)?,
                database: require(&lookup, "DB_DATABASE")?,
                user: require(&lookup, "DB_USER")?,
                password: require(&lookup, "DB_PASSWORD")?,
                max_connections,
                connect_max_attempts,
                connect_base_delay,
            },
        };

        let username = optional("SMTP_USERNAME");
        Ok(Config {
            database,
            storage: StorageConfig {
                access_key_id: optional("AWS_ACCESS_KEY_ID"),
                secret_access_key: optional("AWS_SECRET_ACCESS_KEY"),
                bucket: optional("S3_BUCKET"),
                endpoint: optional("S3_ENDPOINT"),
                region: optional("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            },
            mail: MailConfig {
                smtp_host: optional("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                smtp_port: parse_or(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
                from_address: optional("SMTP_FROM").or_else(|| username.clone()),
                username,
                password: optional("SMTP_PASSWORD"),
                company_name: optional("COMPANY_NAME")
                    .unwrap_or_else(|| DEFAULT_COMPANY_NAME.to_string()),
            },
            cors_allowed_origins: optional("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            external_call_timeout: Duration::from_secs(parse_or(
                &lookup,
                "EXTERNAL_CALL_TIMEOUT_SECS",
                15,
            )?),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return url
                .parse::<PgConnectOptions>()
                .context("DATABASE_URL is not a valid PostgreSQL connection string");
        }
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password))
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
