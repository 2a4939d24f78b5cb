//! Capability provider registry.
//!
//! Every provider is one [`ProviderEntry`]: a name within a slot, the keys
//! it cannot work without, and a pure constructor. Required keys are
//! checked before the constructor runs, and nothing here touches the
//! network, so resolving a bad configuration fails without side effects.

use crate::capability::{
    parse_modalities, ApiKey, CapabilityInstance, CapabilitySlot, LanguageModel, NoiseCanceller,
    RealtimeModel, SpeechToText, TextToSpeech, TurnDetector, VoiceActivityDetector,
};
use crate::config::{
    keys, ProviderConfig, DEFAULT_LLM_PROVIDER, DEFAULT_STT_PROVIDER, DEFAULT_TTS_PROVIDER,
};
use crate::error::{ConfigError, VoiceError};

/// LLM provider that performs speech-to-speech on its own.
pub const REALTIME_PROVIDER: &str = "google";

pub const DEFAULT_VAD: &str = "silero";
pub const DEFAULT_TURN_DETECTOR: &str = "multilingual";
pub const DEFAULT_NOISE_CANCELLER: &str = "bvc";

/// Language substituted when a provider cannot take the `multi` sentinel.
const FALLBACK_LANGUAGE: &str = "en";
const MULTI_LANGUAGE: &str = "multi";

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

type Constructor = fn(&ProviderConfig) -> Result<CapabilityInstance, VoiceError>;

pub struct ProviderEntry {
    pub slot: CapabilitySlot,
    pub name: &'static str,
    /// Keys checked before `build` is invoked.
    pub required: &'static [&'static str],
    /// The constructed instance replaces the whole cascaded pipeline.
    pub realtime: bool,
    build: Constructor,
}

impl ProviderEntry {
    const fn new(
        slot: CapabilitySlot,
        name: &'static str,
        required: &'static [&'static str],
        build: Constructor,
    ) -> Self {
        Self {
            slot,
            name,
            required,
            realtime: false,
            build,
        }
    }

    const fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    pub fn construct(&self, config: &ProviderConfig) -> Result<CapabilityInstance, VoiceError> {
        for key in self.required {
            config.require(key, self.name)?;
        }
        (self.build)(config)
    }
}

static PROVIDERS: &[ProviderEntry] = &[
    ProviderEntry::new(CapabilitySlot::Stt, "deepgram", &[keys::STT_API_KEY], deepgram_stt),
    ProviderEntry::new(CapabilitySlot::Stt, "openai", &[keys::STT_API_KEY], openai_stt),
    ProviderEntry::new(CapabilitySlot::Stt, "groq", &[keys::STT_API_KEY], groq_stt),
    ProviderEntry::new(CapabilitySlot::Llm, "openai", &[keys::LLM_API_KEY], openai_llm),
    ProviderEntry::new(
        CapabilitySlot::Llm,
        REALTIME_PROVIDER,
        &[keys::GOOGLE_API_KEY],
        google_realtime,
    )
    .realtime(),
    ProviderEntry::new(CapabilitySlot::Tts, "openai", &[keys::TTS_API_KEY], openai_tts),
    ProviderEntry::new(CapabilitySlot::Tts, "deepgram", &[keys::TTS_API_KEY], deepgram_tts),
    ProviderEntry::new(CapabilitySlot::Vad, DEFAULT_VAD, &[], |_| {
        Ok(CapabilityInstance::VoiceActivityDetector(
            VoiceActivityDetector {
                provider: DEFAULT_VAD,
            },
        ))
    }),
    ProviderEntry::new(
        CapabilitySlot::TurnDetector,
        DEFAULT_TURN_DETECTOR,
        &[],
        |_| {
            Ok(CapabilityInstance::TurnDetector(TurnDetector {
                provider: DEFAULT_TURN_DETECTOR,
            }))
        },
    ),
    ProviderEntry::new(
        CapabilitySlot::NoiseCancellation,
        DEFAULT_NOISE_CANCELLER,
        &[],
        |_| {
            Ok(CapabilityInstance::NoiseCanceller(NoiseCanceller {
                provider: DEFAULT_NOISE_CANCELLER,
            }))
        },
    ),
];

/// Names accepted for `slot`, in registration order.
pub fn supported_providers(slot: CapabilitySlot) -> Vec<&'static str> {
    PROVIDERS
        .iter()
        .filter(|entry| entry.slot == slot)
        .map(|entry| entry.name)
        .collect()
}

pub fn lookup(slot: CapabilitySlot, name: &str) -> Result<&'static ProviderEntry, ConfigError> {
    PROVIDERS
        .iter()
        .find(|entry| entry.slot == slot && entry.name == name)
        .ok_or_else(|| ConfigError::UnknownProvider {
            slot,
            name: name.to_string(),
            supported: supported_providers(slot).join(", "),
        })
}

/// Provider name configured for `slot`, falling back to the slot default.
///
/// VAD, turn detection and noise cancellation are not selectable yet and
/// always resolve to their fixed provider.
pub fn selected_provider(slot: CapabilitySlot, config: &ProviderConfig) -> &str {
    match slot {
        CapabilitySlot::Stt => config.get_or(keys::STT_PROVIDER, DEFAULT_STT_PROVIDER),
        CapabilitySlot::Llm => config.get_or(keys::LLM_PROVIDER, DEFAULT_LLM_PROVIDER),
        CapabilitySlot::Tts => config.get_or(keys::TTS_PROVIDER, DEFAULT_TTS_PROVIDER),
        CapabilitySlot::Vad => DEFAULT_VAD,
        CapabilitySlot::TurnDetector => DEFAULT_TURN_DETECTOR,
        CapabilitySlot::NoiseCancellation => DEFAULT_NOISE_CANCELLER,
    }
}

/// Constructs the capability configured for `slot`.
///
/// No retry happens here; construction failures go straight to the caller.
pub fn resolve(
    slot: CapabilitySlot,
    config: &ProviderConfig,
) -> Result<CapabilityInstance, VoiceError> {
    let name = selected_provider(slot, config);
    lookup(slot, name)?.construct(config)
}

fn deepgram_stt(config: &ProviderConfig) -> Result<CapabilityInstance, VoiceError> {
    Ok(CapabilityInstance::SpeechToText(SpeechToText {
        provider: "deepgram",
        model: config.get_or(keys::STT_MODEL, "nova-3").to_string(),
        language: config.get(keys::STT_LANGUAGE).map(str::to_string),
        base_url: None,
        api_key: ApiKey::new(config.require(keys::STT_API_KEY, "deepgram")?),
    }))
}

fn openai_stt(config: &ProviderConfig) -> Result<CapabilityInstance, VoiceError> {
    let language = match config.get(keys::STT_LANGUAGE) {
        None | Some(MULTI_LANGUAGE) => FALLBACK_LANGUAGE,
        Some(language) => language,
    };
    Ok(CapabilityInstance::SpeechToText(SpeechToText {
        provider: "openai",
        model: config.get_or(keys::STT_MODEL, "whisper-1").to_string(),
        language: Some(language.to_string()),
        base_url: config.url(keys::STT_BASE_URL)?,
        api_key: ApiKey::new(config.require(keys::STT_API_KEY, "openai")?),
    }))
}

fn groq_stt(config: &ProviderConfig) -> Result<CapabilityInstance, VoiceError> {
    let base_url = match config.url(keys::STT_BASE_URL)? {
        Some(url) => url,
        None => url::Url::parse(GROQ_BASE_URL)
            .map_err(|e| VoiceError::ProviderConstruction(e.to_string()))?,
    };
    Ok(CapabilityInstance::SpeechToText(SpeechToText {
        provider: "groq",
        model: config
            .get_or(keys::STT_MODEL, "whisper-large-v3-turbo")
            .to_string(),
        language: config
            .get(keys::STT_LANGUAGE)
            .filter(|language| *language != MULTI_LANGUAGE)
            .map(str::to_string),
        base_url: Some(base_url),
        api_key: ApiKey::new(config.require(keys::STT_API_KEY, "groq")?),
    }))
}

fn openai_llm(config: &ProviderConfig) -> Result<CapabilityInstance, VoiceError> {
    Ok(CapabilityInstance::LanguageModel(LanguageModel {
        provider: "openai",
        model: config.get_or(keys::LLM_MODEL, "gpt-4o-mini").to_string(),
        base_url: config.url(keys::LLM_BASE_URL)?,
        api_key: ApiKey::new(config.require(keys::LLM_API_KEY, "openai")?),
    }))
}

fn google_realtime(config: &ProviderConfig) -> Result<CapabilityInstance, VoiceError> {
    Ok(CapabilityInstance::IntegratedRealtimeModel(RealtimeModel {
        provider: REALTIME_PROVIDER,
        model: config
            .get_or(keys::LLM_MODEL, "gemini-2.0-flash-exp")
            .to_string(),
        voice: config.get_or(keys::LLM_VOICE, "Puck").to_string(),
        instructions: config.instructions().to_string(),
        temperature: config.parse_f32(keys::LLM_TEMPERATURE)?,
        modalities: parse_modalities(config.get(keys::LLM_MODALITIES)),
        vertex_ai: config.flag(keys::LLM_VERTEXAI),
        project: config.get(keys::GOOGLE_CLOUD_PROJECT).map(str::to_string),
        location: config.get(keys::GOOGLE_CLOUD_LOCATION).map(str::to_string),
        api_key: ApiKey::new(config.require(keys::GOOGLE_API_KEY, REALTIME_PROVIDER)?),
    }))
}

fn openai_tts(config: &ProviderConfig) -> Result<CapabilityInstance, VoiceError> {
    let speed = config.parse_f32(keys::TTS_SPEED)?.unwrap_or(1.0);
    if !(0.1..=10.0).contains(&speed) {
        return Err(ConfigError::InvalidValue {
            key: keys::TTS_SPEED.to_string(),
            reason: "Speed must be between 0.1 and 10.0".to_string(),
        }
        .into());
    }
    Ok(CapabilityInstance::TextToSpeech(TextToSpeech {
        provider: "openai",
        model: config.get_or(keys::TTS_MODEL, "tts-1").to_string(),
        voice: Some(
            config
                .get_or(keys::TTS_VOICE, "en-US-AvaMultilingualNeural")
                .to_string(),
        ),
        speed: Some(speed),
        base_url: config.url(keys::TTS_BASE_URL)?,
        api_key: ApiKey::new(config.require(keys::TTS_API_KEY, "openai")?),
    }))
}

fn deepgram_tts(config: &ProviderConfig) -> Result<CapabilityInstance, VoiceError> {
    Ok(CapabilityInstance::TextToSpeech(TextToSpeech {
        provider: "deepgram",
        model: config.get_or(keys::TTS_MODEL, "sonic-2").to_string(),
        voice: config.get(keys::TTS_VOICE).map(str::to_string),
        speed: None,
        base_url: None,
        api_key: ApiKey::new(config.require(keys::TTS_API_KEY, "deepgram")?),
    }))
}
