//! Voice pipeline assembly for the Parley agent.
//!
//! Resolves speech-to-text, language-model and text-to-speech capabilities
//! from a provider registry, assembles them into either a cascaded pipeline
//! or a single integrated realtime model, and drives the session's opening
//! turn over a room transport (LiveKit in production).
//!
//! Inference itself is out of scope: capability instances are the resolved
//! construction inputs for the backing services, and the transport runtime
//! owns the media path.

pub mod capability;
pub mod config;
pub mod error;
pub mod livekit;
pub mod pipeline;
pub mod registry;
pub mod session;

pub use capability::{
    parse_modalities, ApiKey, CapabilityInstance, CapabilityKind, CapabilitySlot, Modality,
};
pub use config::ProviderConfig;
pub use error::{ConfigError, VoiceError};
pub use livekit::{LiveKitConfig, LiveKitTransport, WorkerMetadata};
pub use pipeline::{assemble, PipelineMode, SessionComponents, SessionSpec};
pub use registry::{resolve, supported_providers};
pub use session::{RoomInputOptions, Transport, GREETING_INSTRUCTIONS};
