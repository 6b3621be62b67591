use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        // 19 MiB, t=2, p=1
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Mounts destructive maintenance routes such as `POST /users/clear`.
    pub maintenance: bool,
    pub hashing: HashingConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: parse_env("ARGON2_MEMORY_KIB")?.unwrap_or(defaults.memory_kib),
            iterations: parse_env("ARGON2_ITERATIONS")?.unwrap_or(defaults.iterations),
            parallelism: parse_env("ARGON2_PARALLELISM")?.unwrap_or(defaults.parallelism),
        };
        Ok(Self {
            database_url,
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS")?.unwrap_or(10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_env("APP_PORT")?.unwrap_or(8080),
            maintenance: std::env::var("USERDIR_MAINTENANCE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            hashing,
        })
    }
}

fn parse_env<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(None),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
