//! Parley worker binary.
//!
//! Usage: `parley-agent start`. Loads `.env`, resolves provider and worker
//! configuration, runs one voice session, then waits for the room to close
//! or for SIGTERM/SIGINT. Fatal configuration errors exit non-zero before
//! any provider is reached; a closed or lost room also exits non-zero.

use parley_agent::{parse_directive, run_session, wait_for_stop, WorkerConfig, WorkerStop};
use parley_voice::{LiveKitTransport, ProviderConfig, WorkerMetadata};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = parse_directive(std::env::args().skip(1)) {
        eprintln!("{}", e);
        return ExitCode::from(2);
    }

    // A missing .env file is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("parley-agent: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let providers = ProviderConfig::from_env();
    tracing::debug!(?providers, "resolved provider configuration");
    tracing::info!(
        room = %config.room,
        identity = %config.identity,
        load_threshold = config.load_threshold,
        "starting parley worker"
    );

    let mut transport = LiveKitTransport::new(
        config.livekit,
        config.room,
        config.identity,
        WorkerMetadata {
            load_threshold: config.load_threshold,
        },
    );

    if let Err(e) = run_session(&providers, &mut transport).await {
        tracing::error!("worker failed to start session: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(sid = ?transport.room_sid(), "session running");

    match wait_for_stop(&mut transport, shutdown_signal()).await {
        Ok(WorkerStop::Shutdown) => {
            tracing::info!("parley worker shut down");
            ExitCode::SUCCESS
        }
        Ok(WorkerStop::RoomClosed) => {
            tracing::warn!("room disconnected, exiting for restart");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("session ended: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, stopping worker"); }
        () = terminate => { tracing::info!("received SIGTERM, stopping worker"); }
    }
}
