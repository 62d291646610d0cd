use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;
const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;

/// Console configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// Backend root URL (default: `http://127.0.0.1:5000`).
    pub base_url: String,
    /// Directory holding the persisted session, history and settings.
    pub data_dir: PathBuf,
    /// HTTP request timeout (default: 600 s; generation is slow).
    pub request_timeout: Duration,
    /// Interval between fake progress ticks (default: 500 ms).
    pub progress_interval: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: default_data_dir(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                   |
    /// |-----------------------------|---------------------------|
    /// | `AIMG_BASE_URL`             | `http://127.0.0.1:5000`   |
    /// | `AIMG_DATA_DIR`             | `<user data dir>/aimg`    |
    /// | `AIMG_REQUEST_TIMEOUT_SECS` | `600`                     |
    /// | `AIMG_PROGRESS_INTERVAL_MS` | `500`                     |
    ///
    /// Unparsable numbers fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("AIMG_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());

        let data_dir = lookup("AIMG_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let request_timeout_secs = parse_or(
            &lookup,
            "AIMG_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        );
        let progress_interval_ms = parse_or(
            &lookup,
            "AIMG_PROGRESS_INTERVAL_MS",
            DEFAULT_PROGRESS_INTERVAL_MS,
        );

        Self {
            base_url,
            data_dir,
            request_timeout: Duration::from_secs(request_timeout_secs),
            progress_interval: Duration::from_millis(progress_interval_ms.max(1)),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "Invalid number, using default");
            default
        }),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aimg")
}
