use std::time::Duration;

use anyhow::{bail, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::DatabaseConfig;

const MAX_CONNECT_DELAY: Duration = Duration::from_secs(30);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Table definitions in dependency order: later tables reference earlier ones.
const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS files (
        id SERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        size BIGINT NOT NULL,
        type VARCHAR(255) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS statuses (
        id SERIAL PRIMARY KEY,
        status VARCHAR(255) NOT NULL DEFAULT 'new',
        job_title VARCHAR(255) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS personal_info (
        id SERIAL PRIMARY KEY,
        firstname VARCHAR(255) NOT NULL,
        lastname VARCHAR(255) NOT NULL,
        gender VARCHAR(255) NOT NULL,
        birthdate VARCHAR(255) NOT NULL,
        phone VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        status_id INT NOT NULL REFERENCES statuses (id),
        file_id INT REFERENCES files (id),
        CONSTRAINT personal_info_email_key UNIQUE (email)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS address_degree (
        id SERIAL PRIMARY KEY,
        zipcode VARCHAR(255) NOT NULL,
        state_province VARCHAR(255) NOT NULL,
        town_city VARCHAR(255) NOT NULL,
        degree VARCHAR(255) NOT NULL,
        course VARCHAR(255),
        program VARCHAR(255),
        institution VARCHAR(255) NOT NULL,
        personal_info_id INT NOT NULL REFERENCES personal_info (id)
    )
    "#,
];

/// Creates the PostgreSQL pool, retrying with exponential backoff until the
/// database answers or the configured attempt budget is spent.
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool> {
    let options = config.connect_options()?;
    let max_attempts = config.connect_max_attempts.max(1);

    let mut attempt = 0;
    loop {
        attempt += 1;
        info!("Connecting to PostgreSQL (attempt {attempt}/{max_attempts})...");

        let result = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => {
                info!("PostgreSQL connection pool established");
                return Ok(pool);
            }
            Err(e) if attempt >= max_attempts => {
                bail!("Could not connect to PostgreSQL after {max_attempts} attempts: {e}")
            }
            Err(e) => {
                let delay = backoff_delay(attempt, config.connect_base_delay, MAX_CONNECT_DELAY);
                warn!(
                    "Connecting to database failed: {e}; retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Delay before retrying after `attempt` failures: base, 2×base, 4×base, ...
/// capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1 << exponent).min(max)
}

/// Idempotently creates the four application tables in one transaction.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Database schema ready");
    Ok(())
}
