use async_trait::async_trait;
use parley_server::supervisor::{Supervisor, WorkerExit, WorkerHandle};
use parley_server::{app, AppState, DEFAULT_INDEX_HTML};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Worker that crashes shortly after launch.
struct Crashing;

#[async_trait]
impl WorkerHandle for Crashing {
    fn id(&self) -> Option<u32> {
        None
    }

    async fn wait(&mut self) -> io::Result<WorkerExit> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(WorkerExit::Code(1))
    }
}

#[tokio::test]
async fn test_landing_page_reachable_during_worker_crash_loop() {
    // 1. Start the status server
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_url = format!("http://{}/", addr);

    tokio::spawn(async move {
        axum::serve(listener, app(AppState::default())).await.unwrap();
    });

    // 2. Start a supervisor whose worker always crashes
    let launches = Arc::new(AtomicU64::new(0));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor_task = {
        let launches = launches.clone();
        tokio::spawn(async move {
            let mut supervisor = Supervisor::new(
                move || {
                    launches.fetch_add(1, Ordering::SeqCst);
                    Ok(Crashing)
                },
                Duration::from_millis(10),
            );
            supervisor.run(shutdown_rx).await;
            supervisor.launches()
        })
    };

    // 3. Poll the landing page while the worker keeps restarting
    let client = reqwest::Client::new();
    for _ in 0..10 {
        let response = client
            .get(&server_url)
            .send()
            .await
            .expect("status server unreachable");
        assert!(response.status().is_success());
        let body = response.text().await.unwrap();
        assert_eq!(body, DEFAULT_INDEX_HTML);

        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // 4. The worker was restarted repeatedly in the meantime
    shutdown_tx.send(true).unwrap();
    let total = supervisor_task.await.unwrap();
    assert!(total >= 3, "expected repeated launches, got {}", total);
    assert_eq!(total, launches.load(Ordering::SeqCst));
}
