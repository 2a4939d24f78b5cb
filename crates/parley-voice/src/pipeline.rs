//! Pipeline assembly: picks cascaded or integrated-realtime mode and builds
//! the session's component set from the registry.

use crate::capability::{
    CapabilityInstance, CapabilityKind, CapabilitySlot, LanguageModel, NoiseCanceller,
    RealtimeModel, SpeechToText, TextToSpeech, TurnDetector, VoiceActivityDetector,
};
use crate::config::ProviderConfig;
use crate::error::VoiceError;
use crate::registry;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    Cascaded,
    IntegratedRealtime,
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cascaded => "cascaded",
            Self::IntegratedRealtime => "integrated-realtime",
        })
    }
}

/// The capabilities a session runs with. The two modes never mix.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionComponents {
    Cascaded {
        stt: SpeechToText,
        llm: LanguageModel,
        tts: TextToSpeech,
        vad: VoiceActivityDetector,
        turn_detector: TurnDetector,
    },
    IntegratedRealtime {
        model: RealtimeModel,
    },
}

/// A fully constructed session, ready to be attached to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSpec {
    /// Persona instructions for the assistant.
    pub instructions: String,
    pub components: SessionComponents,
    /// Applied to the input audio path in both modes.
    pub noise_cancellation: NoiseCanceller,
}

impl SessionSpec {
    pub fn mode(&self) -> PipelineMode {
        match self.components {
            SessionComponents::Cascaded { .. } => PipelineMode::Cascaded,
            SessionComponents::IntegratedRealtime { .. } => PipelineMode::IntegratedRealtime,
        }
    }

    /// Pipeline capabilities, excluding input pre-processing.
    pub fn capabilities(&self) -> Vec<CapabilityKind> {
        match self.components {
            SessionComponents::Cascaded { .. } => vec![
                CapabilityKind::SpeechToText,
                CapabilityKind::LanguageModel,
                CapabilityKind::TextToSpeech,
                CapabilityKind::VoiceActivityDetector,
                CapabilityKind::TurnDetector,
            ],
            SessionComponents::IntegratedRealtime { .. } => {
                vec![CapabilityKind::IntegratedRealtimeModel]
            }
        }
    }
}

/// Builds the session for `config`.
///
/// The mode is decided by the LLM provider selector alone. In realtime mode
/// the STT and TTS selectors are never consulted.
pub fn assemble(config: &ProviderConfig) -> Result<SessionSpec, VoiceError> {
    let llm_provider = registry::selected_provider(CapabilitySlot::Llm, config);
    let llm_entry = registry::lookup(CapabilitySlot::Llm, llm_provider)?;

    let components = if llm_entry.realtime {
        let model = match llm_entry.construct(config)? {
            CapabilityInstance::IntegratedRealtimeModel(model) => model,
            other => return Err(mismatch(CapabilitySlot::Llm, &other)),
        };
        SessionComponents::IntegratedRealtime { model }
    } else {
        let llm = match llm_entry.construct(config)? {
            CapabilityInstance::LanguageModel(llm) => llm,
            other => return Err(mismatch(CapabilitySlot::Llm, &other)),
        };
        let stt = match registry::resolve(CapabilitySlot::Stt, config)? {
            CapabilityInstance::SpeechToText(stt) => stt,
            other => return Err(mismatch(CapabilitySlot::Stt, &other)),
        };
        let tts = match registry::resolve(CapabilitySlot::Tts, config)? {
            CapabilityInstance::TextToSpeech(tts) => tts,
            other => return Err(mismatch(CapabilitySlot::Tts, &other)),
        };
        let vad = match registry::resolve(CapabilitySlot::Vad, config)? {
            CapabilityInstance::VoiceActivityDetector(vad) => vad,
            other => return Err(mismatch(CapabilitySlot::Vad, &other)),
        };
        let turn_detector = match registry::resolve(CapabilitySlot::TurnDetector, config)? {
            CapabilityInstance::TurnDetector(turn_detector) => turn_detector,
            other => return Err(mismatch(CapabilitySlot::TurnDetector, &other)),
        };
        SessionComponents::Cascaded {
            stt,
            llm,
            tts,
            vad,
            turn_detector,
        }
    };

    let noise_cancellation = match registry::resolve(CapabilitySlot::NoiseCancellation, config)? {
        CapabilityInstance::NoiseCanceller(nc) => nc,
        other => return Err(mismatch(CapabilitySlot::NoiseCancellation, &other)),
    };

    let session = SessionSpec {
        instructions: config.instructions().to_string(),
        components,
        noise_cancellation,
    };

    info!(
        mode = %session.mode(),
        llm_provider,
        capabilities = ?session.capabilities(),
        "assembled voice session"
    );

    Ok(session)
}

fn mismatch(slot: CapabilitySlot, instance: &CapabilityInstance) -> VoiceError {
    VoiceError::ProviderConstruction(format!(
        "{} provider '{}' produced a {:?} capability",
        slot,
        instance.provider(),
        instance.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;
    use crate::error::ConfigError;

    #[test]
    fn realtime_mode_requires_google_key() {
        let config = ProviderConfig::from_pairs([(keys::LLM_PROVIDER, "google")]);
        match assemble(&config) {
            Err(VoiceError::Config(ConfigError::MissingKey { key, .. })) => {
                assert_eq!(key, keys::GOOGLE_API_KEY)
            }
            other => panic!("Expected MissingKey, got {:?}", other),
        }
    }

    #[test]
    fn realtime_mode_ignores_cascaded_selectors() {
        let config = ProviderConfig::from_pairs([
            (keys::LLM_PROVIDER, "google"),
            (keys::GOOGLE_API_KEY, "google-key"),
            (keys::STT_PROVIDER, "not-a-provider"),
            (keys::TTS_PROVIDER, "not-a-provider"),
        ]);
        let session = assemble(&config).unwrap();
        assert_eq!(session.mode(), PipelineMode::IntegratedRealtime);
        assert_eq!(
            session.capabilities(),
            vec![CapabilityKind::IntegratedRealtimeModel]
        );
        assert_eq!(session.noise_cancellation.provider, "bvc");
    }

    #[test]
    fn realtime_model_carries_instructions() {
        let config = ProviderConfig::from_pairs([
            (keys::LLM_PROVIDER, "google"),
            (keys::GOOGLE_API_KEY, "google-key"),
            (keys::ASSISTANT_INSTRUCTIONS, "Be brief."),
        ]);
        let session = assemble(&config).unwrap();
        assert_eq!(session.instructions, "Be brief.");
        match session.components {
            SessionComponents::IntegratedRealtime { model } => {
                assert_eq!(model.instructions, "Be brief.")
            }
            other => panic!("Expected realtime components, got {:?}", other),
        }
    }

    #[test]
    fn unknown_llm_provider_fails_before_other_slots() {
        let config = ProviderConfig::from_pairs([(keys::LLM_PROVIDER, "llamafile")]);
        assert!(matches!(
            assemble(&config),
            Err(VoiceError::Config(ConfigError::UnknownProvider {
                slot: CapabilitySlot::Llm,
                ..
            }))
        ));
    }
}
