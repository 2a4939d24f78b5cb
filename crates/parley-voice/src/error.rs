use crate::capability::CapabilitySlot;
use thiserror::Error;

/// Pre-flight configuration failures.
///
/// These are raised before any provider is contacted, so a bad option
/// always surfaces as an immediate diagnostic instead of a failed call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown {slot} provider '{name}' (supported: {supported})")]
    UnknownProvider {
        slot: CapabilitySlot,
        name: String,
        supported: String,
    },

    #[error("{key} is required for provider '{provider}'")]
    MissingKey { key: String, provider: String },

    #[error("{key} must be a number, got '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider construction failed: {0}")]
    ProviderConstruction(String),

    #[error("LiveKit API error: {0}")]
    LiveKit(#[from] livekit_api::access_token::AccessTokenError),

    #[error("Transport error: {0}")]
    Transport(String),
}
