//! Worker process supervision.
//!
//! The supervisor launches the worker, waits for it to exit, logs the
//! outcome and relaunches it after a fixed delay, forever. Every exit is
//! treated the same way: exit codes from the worker runtime cannot be
//! trusted to say whether leaving it down is safe. There is no backoff and
//! no liveness probing beyond process exit.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::sleep;

/// Lifecycle of the supervised worker, as observed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Starting,
    Running,
    ExitedOk,
    ExitedError,
}

/// How a worker run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exited with a status code.
    Code(i32),
    /// Terminated by a signal, no code available.
    Signal,
}

impl WorkerExit {
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Signal => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Code(0))
    }
}

/// A launched worker the supervisor can wait on.
#[async_trait]
pub trait WorkerHandle: Send {
    fn id(&self) -> Option<u32>;

    async fn wait(&mut self) -> io::Result<WorkerExit>;
}

#[async_trait]
impl WorkerHandle for Child {
    fn id(&self) -> Option<u32> {
        Child::id(self)
    }

    async fn wait(&mut self) -> io::Result<WorkerExit> {
        let status = Child::wait(self).await?;
        Ok(status.code().map_or(WorkerExit::Signal, WorkerExit::Code))
    }
}

/// Returns a spawn function launching `program args...` as an independent
/// OS process.
///
/// The worker inherits stdout/stderr so its logs land next to ours, and is
/// killed if its handle is dropped (supervisor shutdown).
pub fn command_spawner<P, I, S>(program: P, args: I) -> impl FnMut() -> io::Result<Child> + Send
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref().to_os_string();
    let args: Vec<_> = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect();
    move || {
        Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
    }
}

pub struct Supervisor<F> {
    spawn: F,
    restart_delay: Duration,
    state: ProcessState,
    launches: u64,
    last_exit: Option<WorkerExit>,
}

impl<F, H> Supervisor<F>
where
    F: FnMut() -> io::Result<H> + Send,
    H: WorkerHandle,
{
    pub fn new(spawn: F, restart_delay: Duration) -> Self {
        Self {
            spawn,
            restart_delay,
            state: ProcessState::Starting,
            launches: 0,
            last_exit: None,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Number of launch attempts so far, including failed spawns.
    pub fn launches(&self) -> u64 {
        self.launches
    }

    pub fn last_exit(&self) -> Option<WorkerExit> {
        self.last_exit
    }

    /// Runs the launch/wait/delay loop until `shutdown` becomes `true` or
    /// its sender is dropped.
    ///
    /// Shutdown is observed between iterations only; a running worker is
    /// never interrupted here.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let delay_secs = self.restart_delay.as_secs_f64();

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.state = ProcessState::Starting;
            self.launches += 1;
            let attempt = self.launches;
            tracing::info!(attempt, "starting worker process");

            let exit = match (self.spawn)() {
                Ok(mut child) => {
                    self.state = ProcessState::Running;
                    tracing::info!(attempt, pid = ?child.id(), "worker process running");
                    child.wait().await
                }
                Err(e) => Err(e),
            };

            match exit {
                Ok(exit) if exit.is_success() => {
                    self.state = ProcessState::ExitedOk;
                    self.last_exit = Some(exit);
                    tracing::info!(
                        attempt,
                        code = 0,
                        restart_in_secs = delay_secs,
                        "worker process exited cleanly, restarting"
                    );
                }
                Ok(exit) => {
                    self.state = ProcessState::ExitedError;
                    self.last_exit = Some(exit);
                    tracing::error!(
                        attempt,
                        code = ?exit.code(),
                        restart_in_secs = delay_secs,
                        "worker process exited with failure, restarting"
                    );
                }
                Err(e) => {
                    self.state = ProcessState::ExitedError;
                    self.last_exit = None;
                    tracing::error!(
                        attempt,
                        error = %e,
                        restart_in_secs = delay_secs,
                        "failed to run worker process, restarting"
                    );
                }
            }

            tokio::select! {
                () = sleep(self.restart_delay) => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        tracing::info!(launches = self.launches, "worker supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    /// A worker that exits as soon as it is waited on.
    struct ExitsImmediately(WorkerExit);

    #[async_trait]
    impl WorkerHandle for ExitsImmediately {
        fn id(&self) -> Option<u32> {
            None
        }

        async fn wait(&mut self) -> io::Result<WorkerExit> {
            Ok(self.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn crash_loop_relaunches_after_each_delay() {
        let delay = Duration::from_secs(5);
        let launched_at = Arc::new(Mutex::new(Vec::new()));
        let spawn = {
            let launched_at = launched_at.clone();
            move || {
                launched_at.lock().unwrap().push(Instant::now());
                Ok(ExitsImmediately(WorkerExit::Code(1)))
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut supervisor = Supervisor::new(spawn, delay);
            supervisor.run(shutdown_rx).await;
            supervisor
        });

        // Launches at t = 0, 5, 10, 15.
        sleep(Duration::from_secs(17)).await;
        assert!(!task.is_finished(), "supervisor must not stop on its own");

        shutdown_tx.send(true).unwrap();
        let supervisor = task.await.unwrap();

        let launched_at = launched_at.lock().unwrap();
        assert_eq!(supervisor.launches(), 4);
        assert_eq!(launched_at.len(), 4);
        for pair in launched_at.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
        assert_eq!(supervisor.state(), ProcessState::ExitedError);
        assert_eq!(supervisor.last_exit(), Some(WorkerExit::Code(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn clean_exit_is_restarted_too() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut supervisor = Supervisor::new(
                || Ok(ExitsImmediately(WorkerExit::Code(0))),
                Duration::from_secs(5),
            );
            supervisor.run(shutdown_rx).await;
            supervisor
        });

        sleep(Duration::from_secs(6)).await;
        shutdown_tx.send(true).unwrap();
        let supervisor = task.await.unwrap();

        assert_eq!(supervisor.launches(), 2);
        assert_eq!(supervisor.state(), ProcessState::ExitedOk);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_failure_is_retried() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut supervisor = Supervisor::new(
                || -> io::Result<ExitsImmediately> {
                    Err(io::Error::new(io::ErrorKind::NotFound, "no such binary"))
                },
                Duration::from_secs(1),
            );
            supervisor.run(shutdown_rx).await;
            supervisor
        });

        sleep(Duration::from_millis(2500)).await;
        shutdown_tx.send(true).unwrap();
        let supervisor = task.await.unwrap();

        assert_eq!(supervisor.launches(), 3);
        assert_eq!(supervisor.state(), ProcessState::ExitedError);
        assert_eq!(supervisor.last_exit(), None);
    }

    #[tokio::test]
    async fn shutdown_before_first_launch() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(true);
        let mut supervisor = Supervisor::new(
            || Ok(ExitsImmediately(WorkerExit::Code(0))),
            Duration::from_secs(5),
        );
        supervisor.run(shutdown_rx).await;
        assert_eq!(supervisor.launches(), 0);
        assert_eq!(supervisor.state(), ProcessState::Starting);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_shutdown_sender_stops_loop() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);
        let mut supervisor = Supervisor::new(
            || Ok(ExitsImmediately(WorkerExit::Signal)),
            Duration::from_secs(5),
        );
        supervisor.run(shutdown_rx).await;
        assert_eq!(supervisor.launches(), 1);
        assert_eq!(supervisor.last_exit(), Some(WorkerExit::Signal));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn real_process_exit_code_is_observed() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut supervisor = Supervisor::new(
                command_spawner("sh", ["-c", "exit 3"]),
                Duration::from_millis(20),
            );
            supervisor.run(shutdown_rx).await;
            supervisor
        });

        sleep(Duration::from_millis(500)).await;
        shutdown_tx.send(true).unwrap();
        let supervisor = task.await.unwrap();

        assert!(supervisor.launches() >= 2, "launches: {}", supervisor.launches());
        assert_eq!(supervisor.last_exit(), Some(WorkerExit::Code(3)));
    }
}
