//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Name of the worker binary installed alongside the server.
pub const WORKER_BINARY: &str = "parley-agent";

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP status surface settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Worker process supervision settings.
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTML file served instead of the built-in landing page.
    #[serde(default)]
    pub index_path: Option<PathBuf>,
}

/// How the worker process is launched and relaunched.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorConfig {
    /// Worker executable. Defaults to `parley-agent` next to the server binary.
    #[serde(default)]
    pub worker_program: Option<PathBuf>,

    #[serde(default = "default_worker_args")]
    pub worker_args: Vec<String>,

    /// Fixed pause between a worker exit and the next launch. Must be at
    /// least one second.
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "parley_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    7860
}

fn default_worker_args() -> Vec<String> {
    vec!["start".to_string()]
}

fn default_restart_delay_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            index_path: None,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            worker_program: None,
            worker_args: default_worker_args(),
            restart_delay_secs: default_restart_delay_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl SupervisorConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    /// Resolves the worker executable.
    ///
    /// Falls back to the binary installed next to the current executable,
    /// then to a `PATH` lookup.
    pub fn worker_program(&self) -> PathBuf {
        if let Some(program) = &self.worker_program {
            return program.clone();
        }
        let binary = format!("{}{}", WORKER_BINARY, std::env::consts::EXE_SUFFIX);
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&binary)))
            .filter(|candidate| candidate.is_file())
            .unwrap_or_else(|| PathBuf::from(binary))
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("invalid value for {key}: '{value}'")]
    InvalidOverride { key: &'static str, value: String },

    /// A value read from the configuration file is out of range.
    #[error("invalid value for {key} in config file: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PARLEY_HOST` overrides `server.host`
/// - `PARLEY_PORT` overrides `server.port`
/// - `PARLEY_INDEX_PATH` overrides `server.index_path`
/// - `PARLEY_WORKER_PROGRAM` overrides `supervisor.worker_program`
/// - `PARLEY_RESTART_DELAY_SECS` overrides `supervisor.restart_delay_secs`
/// - `PARLEY_LOG_LEVEL` overrides `logging.level`
/// - `PARLEY_LOG_JSON` overrides `logging.json` ("true", any case, or "1")
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if an override is malformed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if config.supervisor.restart_delay_secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: "supervisor.restart_delay_secs",
            reason: "must be at least 1".to_string(),
        });
    }

    apply_overrides(config, |key| std::env::var(key).ok())
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn parse_override<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { key, value })
}

/// Applies `PARLEY_*` overrides from `lookup` on top of `config`.
pub fn apply_overrides<F>(mut config: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("PARLEY_HOST") {
        config.server.host = parse_override("PARLEY_HOST", host)?;
    }
    if let Some(port) = lookup("PARLEY_PORT") {
        config.server.port = parse_override("PARLEY_PORT", port)?;
    }
    if let Some(index_path) = lookup("PARLEY_INDEX_PATH") {
        config.server.index_path = Some(PathBuf::from(index_path));
    }
    if let Some(program) = lookup("PARLEY_WORKER_PROGRAM") {
        config.supervisor.worker_program = Some(PathBuf::from(program));
    }
    if let Some(delay) = lookup("PARLEY_RESTART_DELAY_SECS") {
        let secs: u64 = parse_override("PARLEY_RESTART_DELAY_SECS", delay.clone())?;
        if secs == 0 {
            return Err(ConfigError::InvalidOverride {
                key: "PARLEY_RESTART_DELAY_SECS",
                value: delay,
            });
        }
        config.supervisor.restart_delay_secs = secs;
    }
    if let Some(level) = lookup("PARLEY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("PARLEY_LOG_JSON") {
        config.logging.json = is_truthy(&json);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_fixed_surface() {
        let config = Config::default();
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.server.port, 7860);
        assert_eq!(config.supervisor.worker_args, vec!["start".to_string()]);
        assert_eq!(config.supervisor.restart_delay(), Duration::from_secs(5));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.server.port, 7860);
    }

    #[test]
    fn file_values_are_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8080

[supervisor]
worker_program = "/opt/parley/parley-agent"
worker_args = ["start", "--verbose"]
restart_delay_secs = 2
"#
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.supervisor.worker_program(),
            PathBuf::from("/opt/parley/parley-agent")
        );
        assert_eq!(config.supervisor.worker_args.len(), 2);
        assert_eq!(config.supervisor.restart_delay(), Duration::from_secs(2));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        assert!(matches!(
            load_config(file.path().to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let config = apply_overrides(Config::default(), |key| match key {
            "PARLEY_PORT" => Some("9000".to_string()),
            "PARLEY_RESTART_DELAY_SECS" => Some("1".to_string()),
            "PARLEY_LOG_JSON" => Some("true".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.supervisor.restart_delay_secs, 1);
        assert!(config.logging.json);
    }

    #[test]
    fn malformed_override_is_an_error() {
        let result = apply_overrides(Config::default(), |key| {
            (key == "PARLEY_PORT").then(|| "http".to_string())
        });
        match result {
            Err(ConfigError::InvalidOverride { key, value }) => {
                assert_eq!(key, "PARLEY_PORT");
                assert_eq!(value, "http");
            }
            other => panic!("Expected InvalidOverride, got {:?}", other),
        }
    }

    #[test]
    fn zero_restart_delay_override_is_rejected() {
        let result = apply_overrides(Config::default(), |key| {
            (key == "PARLEY_RESTART_DELAY_SECS").then(|| "0".to_string())
        });
        match result {
            Err(ConfigError::InvalidOverride { key, value }) => {
                assert_eq!(key, "PARLEY_RESTART_DELAY_SECS");
                assert_eq!(value, "0");
            }
            other => panic!("Expected InvalidOverride, got {:?}", other),
        }
    }

    #[test]
    fn zero_restart_delay_in_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[supervisor]\nrestart_delay_secs = 0").unwrap();
        match load_config(file.path().to_str()) {
            Err(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "supervisor.restart_delay_secs");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn log_json_flag_ignores_case() {
        for raw in ["TRUE", "True", "1", " true "] {
            let config = apply_overrides(Config::default(), |key| {
                (key == "PARLEY_LOG_JSON").then(|| raw.to_string())
            })
            .unwrap();
            assert!(config.logging.json, "{raw:?} should enable JSON logs");
        }
        let config = apply_overrides(Config::default(), |key| {
            (key == "PARLEY_LOG_JSON").then(|| "yes".to_string())
        })
        .unwrap();
        assert!(!config.logging.json);
    }
}
