//! Worker runtime against a live scheduler on an ephemeral port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;

use mesh_scheduler::api::{self, state::AppState};
use mesh_scheduler::config::Config;
use mesh_scheduler::store::{JobStatus, LeasedJob, MeshStore};
use mesh_scheduler::worker::{
    ClientConfig, ClientError, ExecutorError, JobExecutor, JobOutcome, MeshClient, WorkerRunner,
};

const TOKEN: &str = "worker-test-token";

/// Succeeds with `payload.next` as the new cursor, fails when `payload.fail` is set
struct ScriptedExecutor;

#[async_trait]
impl JobExecutor for ScriptedExecutor {
    async fn execute(&self, job: &LeasedJob) -> Result<JobOutcome, ExecutorError> {
        if job.payload.get("fail").and_then(|v| v.as_bool()) == Some(true) {
            return Err(ExecutorError::Other(format!("site {} refused", job.site_id)));
        }
        let next = job
            .payload
            .get("next")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
        Ok(JobOutcome::succeeded(next))
    }
}

async fn spawn_server() -> (SocketAddr, MeshStore) {
    let mut config = Config::default();
    config.auth.shared_secret = Some(TOKEN.to_string());

    let store = MeshStore::in_memory().await.unwrap();
    let app = api::router(AppState::new(config, store.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    (addr, store)
}

fn client(addr: SocketAddr, token: &str) -> MeshClient {
    let config = ClientConfig {
        max_retries: 0,
        ..ClientConfig::default()
    };
    MeshClient::new(&format!("http://{addr}"), token, config).unwrap()
}

#[tokio::test]
async fn test_runner_executes_and_reports_batch() {
    let (addr, store) = spawn_server().await;
    let now = chrono::Utc::now();
    let ok = store
        .insert_job("siteA", json!({"next": "page-2"}).as_object().unwrap(), now)
        .await
        .unwrap();
    let bad = store
        .insert_job("siteB", json!({"fail": true}).as_object().unwrap(), now)
        .await
        .unwrap();

    let runner = WorkerRunner::builder()
        .client(client(addr, TOKEN))
        .executor(Arc::new(ScriptedExecutor))
        .node_id("w1")
        .max_jobs(5)
        .build();

    runner.register().await.unwrap();
    let stats = runner.run_once().await.unwrap();
    assert_eq!(stats.leased, 2);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.unreported, 0);

    assert!(store.get_worker("w1").await.unwrap().is_some());

    let ok = store.get_job(ok.id).await.unwrap().unwrap();
    assert_eq!(ok.status, JobStatus::Done);
    let bad = store.get_job(bad.id).await.unwrap().unwrap();
    assert_eq!(bad.status, JobStatus::Failed);
    assert_eq!(bad.error_message.as_deref(), Some("site siteB refused"));

    let cursor = store.get_cursor("siteA").await.unwrap().unwrap();
    assert_eq!(cursor.cursor_value, "page-2");
    assert!(store.get_cursor("siteB").await.unwrap().is_none());

    // queue drained
    assert_eq!(runner.run_once().await.unwrap().leased, 0);
}

#[tokio::test]
async fn test_runner_respects_want_sites() {
    let (addr, store) = spawn_server().await;
    let now = chrono::Utc::now();
    store
        .insert_job("siteA", json!({}).as_object().unwrap(), now)
        .await
        .unwrap();

    let runner = WorkerRunner::builder()
        .client(client(addr, TOKEN))
        .executor(Arc::new(ScriptedExecutor))
        .node_id("w1")
        .want_sites(vec!["siteB".to_string()])
        .build();

    assert_eq!(runner.run_once().await.unwrap().leased, 0);
    assert_eq!(store.job_counts().await.unwrap().pending, 1);
}

#[tokio::test]
async fn test_run_loop_stops_on_shutdown() {
    let (addr, _store) = spawn_server().await;

    let runner = WorkerRunner::builder()
        .client(client(addr, TOKEN))
        .executor(Arc::new(ScriptedExecutor))
        .node_id("w1")
        .poll_interval(Duration::from_millis(20))
        .build();

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { runner.run(rx).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_client_surfaces_error_codes() {
    let (addr, _store) = spawn_server().await;

    let err = client(addr, "wrong-token")
        .register("w1", &serde_json::Map::new())
        .await
        .unwrap_err();
    match err {
        ClientError::Status { status, code, .. } => {
            assert_eq!(status, 401);
            assert_eq!(code, "UNAUTHORIZED");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let err = client(addr, TOKEN)
        .lease("w1", None, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 400, .. }));
    assert!(!err.is_retryable());
}
