use memo_board_types::Locale;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value {value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Where the memo collection lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Json,
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "table" => Ok(Backend::Sqlite),
            "json" | "file" => Ok(Backend::Json),
            "memory" => Ok(Backend::Memory),
            _ => Err("expected one of sqlite, json, memory".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub db_path: String,
    pub data_path: PathBuf,
    pub locale: Locale,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9103,
            backend: Backend::Sqlite,
            db_path: "./memo_board.db".to_string(),
            data_path: PathBuf::from("./data/memos.json"),
            locale: Locale::KoKr,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults for
    /// unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout_secs: u64 = parse_var(&lookup, "MEMO_BOARD_REQUEST_TIMEOUT_SECS")?
            .unwrap_or(defaults.request_timeout.as_secs());

        Ok(Self {
            host: lookup("MEMO_BOARD_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "MEMO_BOARD_PORT")?.unwrap_or(defaults.port),
            backend: parse_var(&lookup, "MEMO_BOARD_BACKEND")?.unwrap_or(defaults.backend),
            db_path: lookup("MEMO_BOARD_DB_PATH").unwrap_or(defaults.db_path),
            data_path: lookup("MEMO_BOARD_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            locale: parse_var(&lookup, "MEMO_BOARD_LOCALE")?.unwrap_or(defaults.locale),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
