use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serialization(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Working directory shared by the event log and the reports
    pub base_dir: PathBuf,
    pub ingest_bind: String,
    pub portal_url: String,
    /// JSON file holding portal credentials and operators
    pub settings_path: PathBuf,
    pub scrape_timeout: Duration,
    pub login_timeout: Duration,
    pub http_timeout: Duration,
    pub order_window_days_back: i64,
    pub order_window_days_ahead: i64,
    /// Zero disables the periodic product summary
    pub stats_interval_secs: u64,
    pub max_line_bytes: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PRODFLOW_BASE_DIR` (default: tmp)
    /// - `INGEST_BIND` (default: 0.0.0.0:5050)
    /// - `PORTAL_URL` (default: https://lanx.cargamaquina.com.br/)
    /// - `PRODFLOW_SETTINGS_PATH` (default: configs.json)
    /// - `SCRAPE_TIMEOUT_SECS` (default: 90)
    /// - `LOGIN_TIMEOUT_SECS` (default: 30)
    /// - `HTTP_TIMEOUT_SECS` (default: 30)
    /// - `ORDER_WINDOW_DAYS_BACK` (default: 30)
    /// - `ORDER_WINDOW_DAYS_AHEAD` (default: 60)
    /// - `STATS_INTERVAL_SECS` (default: 60)
    /// - `MAX_LINE_BYTES` (default: 65536)
    pub fn from_env() -> Result<Self, ConfigError> {
        let portal_url = env::var("PORTAL_URL")
            .unwrap_or_else(|_| "https://lanx.cargamaquina.com.br/".to_string());

        if !portal_url.starts_with("http://") && !portal_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "PORTAL_URL must start with http:// or https://".to_string(),
            ));
        }

        let max_line_bytes = parse_var("MAX_LINE_BYTES", 64 * 1024)?;
        if max_line_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_LINE_BYTES must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            base_dir: env::var("PRODFLOW_BASE_DIR")
                .unwrap_or_else(|_| "tmp".to_string())
                .into(),
            ingest_bind: env::var("INGEST_BIND").unwrap_or_else(|_| "0.0.0.0:5050".to_string()),
            portal_url,
            settings_path: env::var("PRODFLOW_SETTINGS_PATH")
                .unwrap_or_else(|_| "configs.json".to_string())
                .into(),
            scrape_timeout: Duration::from_secs(parse_var("SCRAPE_TIMEOUT_SECS", 90)?),
            login_timeout: Duration::from_secs(parse_var("LOGIN_TIMEOUT_SECS", 30)?),
            http_timeout: Duration::from_secs(parse_var("HTTP_TIMEOUT_SECS", 30)?),
            order_window_days_back: parse_var("ORDER_WINDOW_DAYS_BACK", 30)?,
            order_window_days_ahead: parse_var("ORDER_WINDOW_DAYS_AHEAD", 60)?,
            stats_interval_secs: parse_var("STATS_INTERVAL_SECS", 60)?,
            max_line_bytes,
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.base_dir.join(crate::store::LOG_FILE_NAME)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.base_dir.join("reports")
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Unset means default; set but unparseable is an error.
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{}={:?}", name, raw))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            Err(ConfigError::InvalidValue(format!("{} is not valid unicode", name)))
        }
    }
}
