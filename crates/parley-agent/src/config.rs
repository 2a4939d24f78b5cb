//! Worker configuration: transport credentials, room identity, capacity
//! threshold and logging.

use parley_voice::LiveKitConfig;
use thiserror::Error;

pub const DEFAULT_ROOM: &str = "parley-agent";
pub const DEFAULT_IDENTITY: &str = "parley-agent";
/// Report up to full load before the orchestrator marks the worker unavailable.
pub const DEFAULT_LOAD_THRESHOLD: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub livekit: LiveKitConfig,
    pub room: String,
    pub identity: String,
    /// Passed through unchanged to the orchestrator.
    pub load_threshold: f32,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "parley_voice=debug,info").
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum WorkerConfigError {
    #[error("{0} is required to run the worker")]
    Missing(&'static str),

    #[error("AGENT_LOAD_THRESHOLD must be a number between 0.0 and 1.0, got '{0}'")]
    InvalidLoadThreshold(String),
}

impl WorkerConfig {
    /// Reads the worker options from the process environment.
    pub fn from_env() -> Result<Self, WorkerConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    ///
    /// Environment variables:
    /// - `LIVEKIT_URL`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET` (required)
    /// - `LIVEKIT_ROOM`, `AGENT_IDENTITY`
    /// - `AGENT_LOAD_THRESHOLD` (0.0 to 1.0)
    /// - `PARLEY_LOG_LEVEL`, `PARLEY_LOG_JSON` ("true", any case, or "1")
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(WorkerConfigError::Missing(key));

        let livekit = LiveKitConfig::new(
            require("LIVEKIT_URL")?,
            require("LIVEKIT_API_KEY")?,
            require("LIVEKIT_API_SECRET")?,
        );

        let load_threshold = match get("AGENT_LOAD_THRESHOLD") {
            Some(raw) => match raw.trim().parse::<f32>() {
                Ok(value) if (0.0..=1.0).contains(&value) => value,
                _ => return Err(WorkerConfigError::InvalidLoadThreshold(raw)),
            },
            None => DEFAULT_LOAD_THRESHOLD,
        };

        let mut logging = LoggingConfig::default();
        if let Some(level) = get("PARLEY_LOG_LEVEL") {
            logging.level = level;
        }
        if let Some(json) = get("PARLEY_LOG_JSON") {
            let json = json.trim();
            logging.json = json.eq_ignore_ascii_case("true") || json == "1";
        }

        Ok(Self {
            livekit,
            room: get("LIVEKIT_ROOM").unwrap_or_else(|| DEFAULT_ROOM.to_string()),
            identity: get("AGENT_IDENTITY").unwrap_or_else(|| DEFAULT_IDENTITY.to_string()),
            load_threshold,
            logging,
        })
    }
}
