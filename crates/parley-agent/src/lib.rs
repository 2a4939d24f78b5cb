//! The Parley worker process.
//!
//! Launched by the supervisor with the `start` directive, the worker
//! assembles one voice session from its provider configuration, attaches
//! it to the configured room and issues the opening greeting. It then
//! stays up until the room closes or the process is signalled; any exit is
//! the supervisor's cue to start a fresh worker.

pub mod config;

use parley_voice::{session, ProviderConfig, SessionSpec, Transport, VoiceError};
use std::future::Future;
use thiserror::Error;

pub use config::{LoggingConfig, WorkerConfig, WorkerConfigError};

/// Directive the supervisor passes to launch a worker.
pub const START_DIRECTIVE: &str = "start";

/// The worker was launched without the `start` directive.
#[derive(Debug, Error, PartialEq)]
#[error("usage: parley-agent start (got '{0}')")]
pub struct UsageError(pub String);

/// Checks the first command-line argument for the `start` directive.
pub fn parse_directive<I>(mut args: I) -> Result<(), UsageError>
where
    I: Iterator<Item = String>,
{
    match args.next() {
        Some(directive) if directive == START_DIRECTIVE => Ok(()),
        other => Err(UsageError(other.unwrap_or_default())),
    }
}

/// Why a running session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStop {
    /// The process was asked to stop.
    Shutdown,
    /// The room went away underneath the session.
    RoomClosed,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker configuration error: {0}")]
    Config(#[from] WorkerConfigError),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}

/// Assembles a session from `providers` and starts it on `transport`.
///
/// Configuration and construction errors surface before the transport is
/// touched.
pub async fn run_session<T>(
    providers: &ProviderConfig,
    transport: &mut T,
) -> Result<SessionSpec, WorkerError>
where
    T: Transport + ?Sized,
{
    let session = parley_voice::assemble(providers)?;
    session::start(&session, transport, parley_voice::GREETING_INSTRUCTIONS).await?;
    Ok(session)
}

/// Keeps a started session alive until its room closes or `shutdown`
/// resolves, whichever comes first.
pub async fn wait_for_stop<T, S>(transport: &mut T, shutdown: S) -> Result<WorkerStop, WorkerError>
where
    T: Transport + ?Sized,
    S: Future<Output = ()>,
{
    tokio::select! {
        () = shutdown => Ok(WorkerStop::Shutdown),
        closed = transport.closed() => {
            closed?;
            Ok(WorkerStop::RoomClosed)
        }
    }
}
