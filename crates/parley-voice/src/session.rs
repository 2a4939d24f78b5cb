//! Session driver: attaches an assembled session to a transport and
//! triggers the opening turn.

use crate::capability::NoiseCanceller;
use crate::error::VoiceError;
use crate::pipeline::SessionSpec;
use async_trait::async_trait;
use tracing::info;

/// Instruction for the single reply generated when a session starts.
pub const GREETING_INSTRUCTIONS: &str = "Greet the user and offer your assistance.";

/// Pre-processing applied to the audio coming from the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInputOptions {
    pub noise_cancellation: Option<NoiseCanceller>,
}

/// The room/transport boundary a session runs against.
///
/// A session lives until the room disconnects or the worker process exits.
#[async_trait]
pub trait Transport: Send {
    /// Attaches the session's capabilities and input options to the room.
    async fn start(
        &mut self,
        session: &SessionSpec,
        input: &RoomInputOptions,
    ) -> Result<(), VoiceError>;

    /// Joins the room.
    async fn connect(&mut self) -> Result<(), VoiceError>;

    /// Requests one generated reply from the attached session.
    async fn generate_reply(&mut self, instructions: &str) -> Result<(), VoiceError>;

    /// Resolves once the connected room has gone away.
    ///
    /// `Ok` means the room closed; an error means the transport lost track
    /// of it. Either way the session is over.
    async fn closed(&mut self) -> Result<(), VoiceError>;
}

/// Starts `session` on `transport` and issues the opening reply.
///
/// Order matters: the reply needs an attached session and a connected room
/// as its sink, so it is requested last and exactly once.
pub async fn start<T>(
    session: &SessionSpec,
    transport: &mut T,
    opening_instructions: &str,
) -> Result<(), VoiceError>
where
    T: Transport + ?Sized,
{
    let input = RoomInputOptions {
        noise_cancellation: Some(session.noise_cancellation.clone()),
    };

    transport.start(session, &input).await?;
    transport.connect().await?;
    transport.generate_reply(opening_instructions).await?;

    info!(mode = %session.mode(), "voice session started");
    Ok(())
}
