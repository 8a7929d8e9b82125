use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local tables, lost on restart.
    Memory,
    /// SQLite database addressed by a `sqlite:` connection URL.
    Sqlite { url: String },
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub backend: StorageBackend,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let url = std::env::var("DATABASE_URL").ok();
        let mut config = Self::from_url(url.as_deref())?;
        config.max_connections = env_u32("SQLITE_MAX_CONNECTIONS", config.max_connections).max(1);
        config.busy_timeout = Duration::from_millis(env_u64("SQLITE_BUSY_TIMEOUT_MS", 5000));
        Ok(config)
    }

    /// Accepts `memory`, a `sqlite:` URL, or a bare file path. An absent or
    /// blank value selects the default database file in the user data dir.
    pub fn from_url(raw: Option<&str>) -> Result<Self, DbConfigError> {
        let trimmed = raw.map(str::trim).filter(|v| !v.is_empty());

        let backend = match trimmed {
            None => StorageBackend::Sqlite {
                url: file_url(&default_sqlite_path()),
            },
            Some("memory") | Some(":memory:") => StorageBackend::Memory,
            Some(url) if url.starts_with("sqlite:") => StorageBackend::Sqlite {
                url: url.to_string(),
            },
            Some(url) if url.contains("://") => {
                return Err(DbConfigError::UnsupportedScheme {
                    url: url.to_string(),
                })
            }
            Some(path) => StorageBackend::Sqlite {
                url: file_url(&PathBuf::from(path)),
            },
        };

        Ok(Self {
            backend,
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        })
    }

    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

pub fn default_sqlite_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lexicard")
        .join("lexicard.db")
}

fn file_url(path: &std::path::Path) -> String {
    format!("sqlite:{}?mode=rwc", path.display())
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("unsupported DATABASE_URL scheme: {url}")]
    UnsupportedScheme { url: String },
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}
