use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub service: Service,
    pub store: Store,
    pub token: Token,
    pub hasher: Hasher,
    #[serde(default)]
    pub session: Session,
    pub http: Http,
    pub log: Log,
}

#[derive(Debug, Deserialize)]
pub struct Service {
    pub backend: String, // "fake" or "real"
}

#[derive(Deserialize)]
pub struct Store {
    pub backend: String, // "memory", "redis" or "mysql"
    pub dsn: Option<String>,
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
    pub ttl_secs: Option<u64>, // redis only; defaults to token.refresh_ttl_secs
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the dsn may embed credentials
        f.debug_struct("Store")
            .field("backend", &self.backend)
            .field("dsn", &self.dsn.as_ref().map(|_| "<redacted>"))
            .field("redis_prefix", &self.redis_prefix)
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct Token {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Hasher {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub op_timeout_ms: u64,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            op_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

fn default_redis_prefix() -> String {
    "session".to_string()
}

fn default_algorithm() -> String {
    "HS512".to_string()
}

fn default_access_ttl_secs() -> u64 {
    5 * 60
}

fn default_refresh_ttl_secs() -> u64 {
    60 * 60
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix("KEYTURN")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
