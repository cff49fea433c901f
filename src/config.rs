use crate::error::{QueryError, Result};
use crate::session::SessionSpec;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection and polling settings, usually read from a TOML file.
///
/// ```toml
/// region = "us-east-1"
/// output_location = "s3://my-bucket/athena-results/"
/// poll_interval = "3s"
/// timeout = "5m"
/// ```
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub region: Option<String>,
    pub role: Option<String>,
    /// S3 prefix the service stages full results under. Required.
    pub output_location: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Delay between status checks, and the step by which the timeout budget is consumed.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Extra attempts for failed status/result lookups. Zero disables retrying.
    pub lookup_retries: u32,
    /// Drop the first fetched row (the header Athena emits for SELECT results).
    pub skip_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: None,
            role: None,
            output_location: String::new(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            lookup_retries: 0,
            skip_header: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("region", &self.region)
            .field("role", &self.role)
            .field("output_location", &self.output_location)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .field("lookup_retries", &self.lookup_retries)
            .field("skip_header", &self.skip_header)
            .finish()
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            QueryError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
            .map_err(|e| QueryError::config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| QueryError::config(format!("invalid config: {e}")))
    }

    /// `<config_dir>/athena-query/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("athena-query").join("config.toml"))
    }

    /// Read `path` if given, else the default location if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => match Self::default_path() {
                Some(p) if p.is_file() => Self::from_path(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_location.trim().is_empty() {
            return Err(QueryError::config("output_location is required"));
        }
        if self.poll_interval.is_zero() {
            return Err(QueryError::config("poll_interval must be greater than zero"));
        }
        SessionSpec::from_config(self).map(|_| ())
    }
}
