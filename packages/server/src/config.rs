use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::Engine;
use discord::Snowflake;
use dotenvy::dotenv;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: String,
    pub app_component: String,
    pub port: u16,

    pub discord_token: String,
    pub discord_application_id: Snowflake,
    /// Hex-encoded Ed25519 key used to verify interaction requests
    pub discord_public_key: String,

    pub guild_id: Snowflake,
    pub supporter_role_id: Snowflake,
    pub admin_logs_channel_id: Snowflake,

    pub database: DatabaseConfig,

    pub readiness_timeout: Duration,
    pub sync_interval: Duration,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub use_ssl: bool,
    /// Base64 of the PEM CA bundle
    pub ca_certificate: String,
    pub pool_min_size: u32,
    pub pool_max_size: u32,
}

// Keep the password out of logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("name", &self.name)
            .field("use_ssl", &self.use_ssl)
            .field("pool_min_size", &self.pool_min_size)
            .field("pool_max_size", &self.pool_max_size)
            .finish_non_exhaustive()
    }
}

fn read_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key).with_context(|| format!("{} must be set", key))
        };
        let parsed = |key: &str| -> Result<u64> {
            required(key)?
                .trim()
                .parse()
                .with_context(|| format!("{} must be a valid number", key))
        };

        let sync_interval_hours: u64 = match lookup("SUPPORTER_SYNC_INTERVAL_HOURS") {
            Some(v) => v
                .trim()
                .parse()
                .context("SUPPORTER_SYNC_INTERVAL_HOURS must be a valid number")?,
            None => 12,
        };
        if sync_interval_hours == 0 {
            bail!("SUPPORTER_SYNC_INTERVAL_HOURS must be greater than zero");
        }

        let database = DatabaseConfig {
            scheme: required("READ_DB_SCHEME")?,
            host: required("READ_DB_HOST")?,
            port: u16::try_from(parsed("READ_DB_PORT")?)
                .context("READ_DB_PORT must be a valid port")?,
            user: required("READ_DB_USER")?,
            password: required("READ_DB_PASS")?,
            name: required("READ_DB_NAME")?,
            use_ssl: read_bool(&required("READ_DB_USE_SSL")?),
            ca_certificate: required("READ_DB_CA_CERTIFICATE")?,
            pool_min_size: u32::try_from(parsed("DB_POOL_MIN_SIZE")?)
                .context("DB_POOL_MIN_SIZE is out of range")?,
            pool_max_size: u32::try_from(parsed("DB_POOL_MAX_SIZE")?)
                .context("DB_POOL_MAX_SIZE is out of range")?,
        };
        if database.pool_min_size > database.pool_max_size {
            bail!("DB_POOL_MIN_SIZE must not exceed DB_POOL_MAX_SIZE");
        }

        Ok(Self {
            app_env: required("APP_ENV")?,
            app_component: required("APP_COMPONENT")?,
            port: match lookup("PORT") {
                Some(p) => p.trim().parse().context("PORT must be a valid number")?,
                None => 8080,
            },
            discord_token: required("DISCORD_TOKEN")?,
            discord_application_id: Snowflake(parsed("DISCORD_APPLICATION_ID")?),
            discord_public_key: required("DISCORD_PUBLIC_KEY")?,
            guild_id: Snowflake(parsed("ROSU_DISCORD_GUILD_ID")?),
            supporter_role_id: Snowflake(parsed("ROSU_DISCORD_DONOR_ROLE_ID")?),
            admin_logs_channel_id: Snowflake(parsed("ROSU_DISCORD_ADMIN_LOGS_CHANNEL_ID")?),
            database,
            readiness_timeout: Duration::from_secs(parsed("SERVICE_READINESS_TIMEOUT")?),
            sync_interval: Duration::from_secs(sync_interval_hours * 60 * 60),
        })
    }
}

impl DatabaseConfig {
    /// Connection options for the read replica.
    pub fn connect_options(&self) -> Result<MySqlConnectOptions> {
        if !self.scheme.eq_ignore_ascii_case("mysql") {
            bail!(
                "READ_DB_SCHEME {:?} is not supported (expected \"mysql\")",
                self.scheme
            );
        }

        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name);

        if !self.use_ssl {
            return Ok(options.ssl_mode(MySqlSslMode::Disabled));
        }

        let ca_pem = base64::engine::general_purpose::STANDARD
            .decode(self.ca_certificate.trim())
            .context("READ_DB_CA_CERTIFICATE must be valid base64")?;

        Ok(options
            .ssl_mode(MySqlSslMode::VerifyCa)
            .ssl_ca_from_pem(ca_pem))
    }
}
