use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "MSDASH_CONFIG";

const CONFIG_NAMES: [&str; 4] = ["msdash.yml", "msdash.yaml", ".msdash.yml", ".msdash.yaml"];

/// Root configuration file structure
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DashConfig {
    /// Control server base address
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Host that running microservices are reached on when probing
    #[serde(default = "default_probe_host")]
    pub probe_host: String,

    /// Also refresh the running map on this period. Unset means refresh
    /// only on mount and after each start/stop.
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    /// Timeout for every HTTP request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Where the TUI writes its log
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_server_url() -> String {
    "http://localhost:8000".into()
}
fn default_probe_host() -> String {
    "localhost".into()
}
fn default_request_timeout() -> u64 {
    10_000
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            probe_host: default_probe_host(),
            poll_interval_ms: None,
            request_timeout_ms: default_request_timeout(),
            log_file: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl DashConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        // an empty file is a valid config with every default
        let config: DashConfig = if content.trim().is_empty() {
            DashConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Find a config file: `MSDASH_CONFIG` first, then `start_dir` and its
    /// parents. `Ok(None)` when there is none.
    pub fn discover(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::discover_with(start_dir, from_env)
    }

    fn discover_with(
        start_dir: &Path,
        explicit: Option<PathBuf>,
    ) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load(&path)?;
            return Ok(Some((path, config)));
        }

        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &CONFIG_NAMES {
                let path = current.join(name);
                if path.is_file() {
                    let config = Self::load(&path)?;
                    return Ok(Some((path, config)));
                }
            }
            dir = current.parent();
        }

        Ok(None)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "server_url",
                reason: format!("'{}' is not an http(s) URL", self.server_url),
            });
        }
        if self.probe_host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "probe_host",
                reason: "must not be empty".into(),
            });
        }
        if self.poll_interval_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: "must be greater than 0 (omit it to disable periodic polling)".into(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }

    /// Replace the server URL (e.g. from `--server`), re-validating it
    pub fn with_server_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.server_url = url.into().trim_end_matches('/').to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("msdash.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashConfig::from_str("").unwrap();
        assert_eq!(config.server_url, "http://localhost:8000");
        assert_eq!(config.probe_host, "localhost");
        assert_eq!(config.poll_interval(), None);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server_url: "http://10.0.0.5:8000"
probe_host: "10.0.0.5"
poll_interval_ms: 2000
request_timeout_ms: 500
log_file: /tmp/dash.log
"#;
        let config = DashConfig::from_str(yaml).unwrap();
        assert_eq!(config.probe_host, "10.0.0.5");
        assert_eq!(config.poll_interval(), Some(Duration::from_secs(2)));
        assert_eq!(config.log_file(), PathBuf::from("/tmp/dash.log"));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let result = DashConfig::from_str("poll_interval_ms: 0");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_non_http_server() {
        let result = DashConfig::from_str("server_url: localhost:8000");
        assert!(matches!(result, Err(ConfigError::Invalid { field: "server_url", .. })));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(matches!(
            DashConfig::from_str("sever_url: http://x"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_server_override_trims_slash() {
        let config = DashConfig::default()
            .with_server_url("http://example.test:9000/")
            .unwrap();
        assert_eq!(config.server_url, "http://example.test:9000");
        assert!(DashConfig::default().with_server_url("ftp://x").is_err());
    }

    #[test]
    fn test_discover_walks_parents() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join("msdash.yml"), "probe_host: box\n").unwrap();

        let (path, config) = DashConfig::discover_with(&nested, None).unwrap().unwrap();
        assert_eq!(path, root.path().join("msdash.yml"));
        assert_eq!(config.probe_host, "box");
    }

    #[test]
    fn test_discover_explicit_path_must_exist() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nope.yml");
        assert!(matches!(
            DashConfig::discover_with(root.path(), Some(missing)),
            Err(ConfigError::Io(_))
        ));
    }
}
