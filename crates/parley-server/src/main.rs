//! Parley server binary: supervises the worker process and serves the
//! status page.
//!
//! The HTTP server and the supervisor loop run as independent tasks. The
//! server shuts down gracefully on SIGTERM/SIGINT; the supervisor is then
//! told to stop and the live worker is killed with it.

use parley_server::config;
use parley_server::supervisor::{command_spawner, Supervisor};
use parley_server::{app, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("PARLEY_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("parley.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    // Initialize tracing
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

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let state = AppState::load(config.server.index_path.as_deref())
        .expect("failed to read landing page; check server.index_path in config");

    // Start the worker supervisor
    let program = config.supervisor.worker_program();
    tracing::info!(
        program = %program.display(),
        args = ?config.supervisor.worker_args,
        restart_delay_secs = config.supervisor.restart_delay_secs,
        "starting worker supervisor"
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut supervisor = Supervisor::new(
        command_spawner(program, config.supervisor.worker_args.clone()),
        config.supervisor.restart_delay(),
    );
    let supervisor_task = tokio::spawn(async move { supervisor.run(shutdown_rx).await });

    // Serve the status page
    let addr = SocketAddr::new(config.server.host, config.server.port);
    tracing::info!(%addr, "starting parley status server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // The supervisor only checks for shutdown between runs; aborting drops
    // the running child, which kills it.
    let _ = shutdown_tx.send(true);
    supervisor_task.abort();
    let _ = supervisor_task.await;

    tracing::info!("parley server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
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
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
