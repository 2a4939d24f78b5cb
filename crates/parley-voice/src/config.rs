//! Provider configuration snapshot.
//!
//! A [`ProviderConfig`] is taken once at process start and handed by
//! reference to every constructor in the registry. Nothing below this
//! module reads the process environment.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Option names understood by the registry and the assembler.
pub mod keys {
    pub const ASSISTANT_INSTRUCTIONS: &str = "ASSISTANT_INSTRUCTIONS";

    pub const STT_PROVIDER: &str = "STT_PROVIDER";
    pub const STT_MODEL: &str = "STT_MODEL";
    pub const STT_API_KEY: &str = "STT_API_KEY";
    pub const STT_LANGUAGE: &str = "STT_LANGUAGE";
    pub const STT_BASE_URL: &str = "STT_BASE_URL";

    pub const LLM_PROVIDER: &str = "LLM_PROVIDER";
    pub const LLM_MODEL: &str = "LLM_MODEL";
    pub const LLM_API_KEY: &str = "LLM_API_KEY";
    pub const LLM_BASE_URL: &str = "LLM_BASE_URL";
    pub const LLM_VOICE: &str = "LLM_VOICE";
    pub const LLM_TEMPERATURE: &str = "LLM_TEMPERATURE";
    pub const LLM_MODALITIES: &str = "LLM_MODALITIES";
    pub const LLM_VERTEXAI: &str = "LLM_VERTEXAI";
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    pub const GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
    pub const GOOGLE_CLOUD_LOCATION: &str = "GOOGLE_CLOUD_LOCATION";

    pub const TTS_PROVIDER: &str = "TTS_PROVIDER";
    pub const TTS_MODEL: &str = "TTS_MODEL";
    pub const TTS_VOICE: &str = "TTS_VOICE";
    pub const TTS_API_KEY: &str = "TTS_API_KEY";
    pub const TTS_BASE_URL: &str = "TTS_BASE_URL";
    pub const TTS_SPEED: &str = "TTS_SPEED";

    /// Every key captured by [`super::ProviderConfig::from_env`].
    pub const ALL: &[&str] = &[
        ASSISTANT_INSTRUCTIONS,
        STT_PROVIDER,
        STT_MODEL,
        STT_API_KEY,
        STT_LANGUAGE,
        STT_BASE_URL,
        LLM_PROVIDER,
        LLM_MODEL,
        LLM_API_KEY,
        LLM_BASE_URL,
        LLM_VOICE,
        LLM_TEMPERATURE,
        LLM_MODALITIES,
        LLM_VERTEXAI,
        GOOGLE_API_KEY,
        GOOGLE_CLOUD_PROJECT,
        GOOGLE_CLOUD_LOCATION,
        TTS_PROVIDER,
        TTS_MODEL,
        TTS_VOICE,
        TTS_API_KEY,
        TTS_BASE_URL,
        TTS_SPEED,
    ];

    /// Keys whose values must never appear in logs.
    pub(crate) const SECRET: &[&str] = &[STT_API_KEY, LLM_API_KEY, GOOGLE_API_KEY, TTS_API_KEY];
}

pub const DEFAULT_STT_PROVIDER: &str = "deepgram";
pub const DEFAULT_LLM_PROVIDER: &str = "openai";
pub const DEFAULT_TTS_PROVIDER: &str = "openai";
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful voice AI assistant.";

/// Immutable key/value options for the capability providers.
///
/// Empty or whitespace-only values are dropped on construction, so an
/// exported-but-blank variable behaves exactly like an absent one.
#[derive(Clone, Default, PartialEq)]
pub struct ProviderConfig {
    values: BTreeMap<String, String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.values {
            if keys::SECRET.contains(&key.as_str()) {
                map.entry(key, &"[REDACTED]");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

impl ProviderConfig {
    /// Captures every recognized key from the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(
            keys::ALL
                .iter()
                .filter_map(|key| std::env::var(key).ok().map(|value| (*key, value))),
        )
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into().trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Returns the value of a key the selected `provider` cannot work without.
    pub fn require(&self, key: &str, provider: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
            provider: provider.to_string(),
        })
    }

    /// Parses an optional numeric option. Absent is `Ok(None)`; garbage is an error.
    pub fn parse_f32(&self, key: &str) -> Result<Option<f32>, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        match raw.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(ConfigError::InvalidNumber {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    /// Parses an optional endpoint override.
    pub fn url(&self, key: &str) -> Result<Option<Url>, ConfigError> {
        self.get(key)
            .map(|raw| {
                Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("'{}' is not a valid URL: {}", raw, e),
                })
            })
            .transpose()
    }

    pub fn instructions(&self) -> &str {
        self.get_or(keys::ASSISTANT_INSTRUCTIONS, DEFAULT_INSTRUCTIONS)
    }
}
