//! Configuration types for frame-prep

use crate::error::{Error, Result};
use crate::types::OutputMode;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use url::Url;

/// Environment variable naming the JSON config file loaded by the binary
pub const CONFIG_PATH_ENV: &str = "FRAME_PREP_CONFIG";

/// Storage root and job directory lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per job (default: "./vlm_files")
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// What happens to a job directory after the job failed (default: keep)
    #[serde(default)]
    pub failed_job_policy: FailedJobPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            failed_job_policy: FailedJobPolicy::default(),
        }
    }
}

/// Handling of partially populated job directories after a failure
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailedJobPolicy {
    /// Leave the directory in place for external cleanup
    #[default]
    Keep,
    /// Remove the directory and everything fetched so far
    Delete,
}

/// Frame fetching behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout, in seconds on the wire (default: 60)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Upstream host that relative frame references are resolved against
    #[serde(default)]
    pub base_url: Option<Url>,

    /// User-Agent header sent with every fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Directory that local frame paths must live under (default: none, local
    /// paths are rejected)
    #[serde(default)]
    pub local_source_root: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            base_url: None,
            user_agent: default_user_agent(),
            local_source_root: None,
        }
    }
}

/// How completed jobs are handed back to the caller
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output mode when a request does not choose one
    #[serde(default)]
    pub mode: OutputMode,

    /// Public address under which the storage root is reachable,
    /// e.g. "https://frames.example.com/files"
    #[serde(default)]
    pub public_base_url: Option<Url>,
}

/// HTTP server settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Serve the storage root read-only under `static_mount` (default: false)
    #[serde(default)]
    pub expose_storage: bool,

    /// URL prefix for the exposed storage root (default: "/files")
    #[serde(default = "default_static_mount")]
    pub static_mount: String,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            expose_storage: false,
            static_mount: default_static_mount(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for frame-prep
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage root and failed-job handling
    #[serde(default)]
    pub storage: StorageConfig,

    /// Fetch timeout and relative-reference resolution
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Output mode and public address
    #[serde(default)]
    pub output: OutputConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load a config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        let config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("invalid config file '{}': {}", path.display(), e),
            key: None,
        })?;
        Ok(config)
    }

    /// Load the config named by `FRAME_PREP_CONFIG` (or defaults), then apply
    /// environment overrides and validate
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FRAME_PREP_*` overrides using `lookup` to read variables
    ///
    /// Recognized keys:
    /// - `FRAME_PREP_STORAGE_ROOT`
    /// - `FRAME_PREP_FAILED_JOB_POLICY` (`keep` | `delete`)
    /// - `FRAME_PREP_FETCH_TIMEOUT` (seconds)
    /// - `FRAME_PREP_BASE_URL`
    /// - `FRAME_PREP_LOCAL_SOURCE_ROOT`
    /// - `FRAME_PREP_OUTPUT_MODE`
    /// - `FRAME_PREP_PUBLIC_BASE_URL`
    /// - `FRAME_PREP_BIND_ADDRESS`
    /// - `FRAME_PREP_EXPOSE_STORAGE` (`true` | `false`)
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(root) = lookup("FRAME_PREP_STORAGE_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(policy) = lookup("FRAME_PREP_FAILED_JOB_POLICY") {
            self.storage.failed_job_policy = match policy.to_lowercase().as_str() {
                "keep" => FailedJobPolicy::Keep,
                "delete" => FailedJobPolicy::Delete,
                other => return Err(env_error("FRAME_PREP_FAILED_JOB_POLICY", other)),
            };
        }
        if let Some(timeout) = lookup("FRAME_PREP_FETCH_TIMEOUT") {
            let secs: u64 = timeout
                .parse()
                .map_err(|_| env_error("FRAME_PREP_FETCH_TIMEOUT", &timeout))?;
            self.fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(base) = lookup("FRAME_PREP_BASE_URL") {
            let url = Url::parse(&base).map_err(|_| env_error("FRAME_PREP_BASE_URL", &base))?;
            self.fetch.base_url = Some(url);
        }
        if let Some(root) = lookup("FRAME_PREP_LOCAL_SOURCE_ROOT") {
            self.fetch.local_source_root = Some(PathBuf::from(root));
        }
        if let Some(mode) = lookup("FRAME_PREP_OUTPUT_MODE") {
            self.output.mode = mode
                .parse()
                .map_err(|_| env_error("FRAME_PREP_OUTPUT_MODE", &mode))?;
        }
        if let Some(public) = lookup("FRAME_PREP_PUBLIC_BASE_URL") {
            let url = Url::parse(&public)
                .map_err(|_| env_error("FRAME_PREP_PUBLIC_BASE_URL", &public))?;
            self.output.public_base_url = Some(url);
        }
        if let Some(addr) = lookup("FRAME_PREP_BIND_ADDRESS") {
            self.server.bind_address = addr
                .parse()
                .map_err(|_| env_error("FRAME_PREP_BIND_ADDRESS", &addr))?;
        }
        if let Some(expose) = lookup("FRAME_PREP_EXPOSE_STORAGE") {
            self.server.expose_storage = expose
                .parse()
                .map_err(|_| env_error("FRAME_PREP_EXPOSE_STORAGE", &expose))?;
        }
        Ok(())
    }

    /// Check cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout.is_zero() {
            return Err(Error::Config {
                message: "fetch timeout must be greater than zero".into(),
                key: Some("fetch.timeout".into()),
            });
        }

        if let Some(base) = &self.fetch.base_url
            && !matches!(base.scheme(), "http" | "https")
        {
            return Err(Error::Config {
                message: format!("base_url must be http or https, got '{}'", base),
                key: Some("fetch.base_url".into()),
            });
        }

        if !self.server.static_mount.starts_with('/') || self.server.static_mount == "/" {
            return Err(Error::Config {
                message: format!(
                    "static_mount must be a non-root path starting with '/', got '{}'",
                    self.server.static_mount
                ),
                key: Some("server.static_mount".into()),
            });
        }

        if self.output.mode.needs_public_url() && self.output.public_base_url.is_none() {
            return Err(Error::Config {
                message: format!(
                    "output mode '{}' requires public_base_url",
                    self.output.mode
                ),
                key: Some("output.public_base_url".into()),
            });
        }

        Ok(())
    }
}

fn env_error(key: &str, value: &str) -> Error {
    Error::Config {
        message: format!("invalid value '{}' for {}", value, key),
        key: Some(key.to_string()),
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./vlm_files")
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    format!("frame-prep/{}", env!("CARGO_PKG_VERSION"))
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_static_mount() -> String {
    "/files".into()
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
