//! Capability instances produced by the provider registry.
//!
//! Each instance is the fully resolved construction input for one backing
//! service. Inference itself happens behind the transport runtime; these
//! values are what a session hands to it.

use std::fmt;
use std::str::FromStr;
use url::Url;

/// A role in the pipeline that exactly one provider fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilitySlot {
    Stt,
    Llm,
    Tts,
    Vad,
    TurnDetector,
    NoiseCancellation,
}

impl fmt::Display for CapabilitySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stt => "STT",
            Self::Llm => "LLM",
            Self::Tts => "TTS",
            Self::Vad => "VAD",
            Self::TurnDetector => "turn detector",
            Self::NoiseCancellation => "noise cancellation",
        })
    }
}

/// Provider credential. Never rendered by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Output modality of an integrated realtime model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Audio,
    Text,
}

impl FromStr for Modality {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUDIO" => Ok(Self::Audio),
            "TEXT" => Ok(Self::Text),
            _ => Err(()),
        }
    }
}

/// Parses a comma-separated modality list, keeping only known entries.
///
/// Returns `None` when nothing usable remains so the provider applies its
/// own default instead of receiving an explicit empty list.
pub fn parse_modalities(raw: Option<&str>) -> Option<Vec<Modality>> {
    let parsed: Vec<Modality> = raw?
        .split(',')
        .filter_map(|entry| entry.parse().ok())
        .collect();
    (!parsed.is_empty()).then_some(parsed)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechToText {
    pub provider: &'static str,
    pub model: String,
    pub language: Option<String>,
    pub base_url: Option<Url>,
    pub api_key: ApiKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageModel {
    pub provider: &'static str,
    pub model: String,
    pub base_url: Option<Url>,
    pub api_key: ApiKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextToSpeech {
    pub provider: &'static str,
    pub model: String,
    pub voice: Option<String>,
    /// Speech speed multiplier (1.0 is normal).
    pub speed: Option<f32>,
    pub base_url: Option<Url>,
    pub api_key: ApiKey,
}

/// A single speech-to-speech model replacing the whole cascaded pipeline.
///
/// Optional fields stay `None` unless explicitly configured; the backing
/// service may treat an explicit default differently from an absent field.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeModel {
    pub provider: &'static str,
    pub model: String,
    pub voice: String,
    pub instructions: String,
    pub temperature: Option<f32>,
    pub modalities: Option<Vec<Modality>>,
    /// Route through the cloud project deployment instead of the hosted API.
    pub vertex_ai: bool,
    pub project: Option<String>,
    pub location: Option<String>,
    pub api_key: ApiKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceActivityDetector {
    pub provider: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnDetector {
    pub provider: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseCanceller {
    pub provider: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    SpeechToText,
    LanguageModel,
    TextToSpeech,
    VoiceActivityDetector,
    TurnDetector,
    NoiseCanceller,
    IntegratedRealtimeModel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityInstance {
    SpeechToText(SpeechToText),
    LanguageModel(LanguageModel),
    TextToSpeech(TextToSpeech),
    VoiceActivityDetector(VoiceActivityDetector),
    TurnDetector(TurnDetector),
    NoiseCanceller(NoiseCanceller),
    IntegratedRealtimeModel(RealtimeModel),
}

impl CapabilityInstance {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::SpeechToText(_) => CapabilityKind::SpeechToText,
            Self::LanguageModel(_) => CapabilityKind::LanguageModel,
            Self::TextToSpeech(_) => CapabilityKind::TextToSpeech,
            Self::VoiceActivityDetector(_) => CapabilityKind::VoiceActivityDetector,
            Self::TurnDetector(_) => CapabilityKind::TurnDetector,
            Self::NoiseCanceller(_) => CapabilityKind::NoiseCanceller,
            Self::IntegratedRealtimeModel(_) => CapabilityKind::IntegratedRealtimeModel,
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::SpeechToText(c) => c.provider,
            Self::LanguageModel(c) => c.provider,
            Self::TextToSpeech(c) => c.provider,
            Self::VoiceActivityDetector(c) => c.provider,
            Self::TurnDetector(c) => c.provider,
            Self::NoiseCanceller(c) => c.provider,
            Self::IntegratedRealtimeModel(c) => c.provider,
        }
    }
}
