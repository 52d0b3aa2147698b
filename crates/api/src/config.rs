use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running next to a local queue
/// directory.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Directory holding pending job descriptors (default: `queue`).
    pub queue_dir: PathBuf,
    /// Directory result assets are written to (default: `uploads`).
    pub upload_dir: PathBuf,
    /// SQLite file holding the dispatch record (default: `dispatch.db`).
    pub db_path: PathBuf,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Largest accepted upload body in bytes (default: 64 MiB).
    pub max_upload_bytes: usize,
}

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be a valid {expected}, got '{value}'")]
pub struct ConfigError {
    pub var: &'static str,
    pub expected: &'static str,
    pub value: String,
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default        |
    /// |------------------------|----------------|
    /// | `HOST`                 | `0.0.0.0`      |
    /// | `PORT`                 | `5000`         |
    /// | `QUEUE_DIR`            | `queue`        |
    /// | `UPLOAD_DIR`           | `uploads`      |
    /// | `DISPATCH_DB_PATH`     | `dispatch.db`  |
    /// | `REQUEST_TIMEOUT_SECS` | `30`           |
    /// | `MAX_UPLOAD_BYTES`     | `67108864`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_var("PORT", "u16", 5000)?;
        let queue_dir = path_var("QUEUE_DIR", "queue");
        let upload_dir = path_var("UPLOAD_DIR", "uploads");
        let db_path = path_var("DISPATCH_DB_PATH", "dispatch.db");
        let request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", "u64", 30)?;
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", "usize", DEFAULT_MAX_UPLOAD_BYTES)?;

        Ok(Self {
            host,
            port,
            queue_dir,
            upload_dir,
            db_path,
            request_timeout_secs,
            max_upload_bytes,
        })
    }
}

fn path_var(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn parse_var<T: std::str::FromStr>(
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => parse_value(var, expected, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(
    var: &'static str,
    expected: &'static str,
    raw: &str,
) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError {
        var,
        expected,
        value: raw.to_string(),
    })
}
