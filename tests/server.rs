// tests/server.rs

//! Endpoint tests against a live agent server on an ephemeral port.

use deckhand::config::MasterConfig;
use deckhand::entities::{
    ApplicationInstance, ApplicationRepository, ApplicationState, MemoryApplicationRepository,
    MemoryVHostRepository, VHostRepository,
};
use deckhand::jobs::{JobQueue, MemoryJobQueue};
use deckhand::server::{AgentState, routes};
use deckhand::sync::{DeployStrategy, WebServerStrategy};
use std::sync::Arc;
use tempfile::TempDir;

struct TestAgent {
    base_url: String,
    applications: Arc<MemoryApplicationRepository>,
    queue: Arc<MemoryJobQueue>,
    _config_dir: TempDir,
}

async fn spawn_agent() -> TestAgent {
    let config_dir = TempDir::new().unwrap();
    let master = MasterConfig::load(config_dir.path().join("master.json"));
    master
        .create(
            "node-1".to_string(),
            "node-secret".to_string(),
            "https://master.example.org".to_string(),
            "master-secret".to_string(),
        )
        .unwrap();

    let applications = Arc::new(MemoryApplicationRepository::new());
    let queue = Arc::new(MemoryJobQueue::new());
    let state = Arc::new(AgentState::new(
        Arc::clone(&applications) as Arc<dyn ApplicationRepository>,
        Arc::new(MemoryVHostRepository::new()) as Arc<dyn VHostRepository>,
        Arc::new(WebServerStrategy) as Arc<dyn DeployStrategy>,
        Arc::clone(&queue) as Arc<dyn JobQueue>,
        Arc::new(master),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, routes::router(state)).await.unwrap();
    });

    TestAgent {
        base_url: format!("http://{addr}"),
        applications,
        queue,
        _config_dir: config_dir,
    }
}

#[tokio::test]
async fn requests_without_master_secret_are_rejected() {
    let agent = spawn_agent().await;
    let client = reqwest::Client::new();

    let response = client.get(&agent.base_url).send().await.unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .get(&agent.base_url)
        .header("Authorization", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn info_endpoint_reports_identity_and_state() {
    let agent = spawn_agent().await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(&agent.base_url)
        .header("Authorization", "master-secret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["id"], "node-1");
    assert_eq!(body["state"], "uninitialized");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn notify_schedules_deployments_and_reports_building() {
    let agent = spawn_agent().await;
    let client = reqwest::Client::new();

    let mut app = ApplicationInstance::new("shop", ApplicationState::Deployed);
    app.desired_version = Some("2.0.0".to_string());
    app.deployed_version = Some("1.0.0".to_string());
    agent.applications.insert(app);

    let body: serde_json::Value = client
        .post(format!("{}/notify", agent.base_url))
        .header("Authorization", "master-secret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["state"], "building");
    assert_eq!(agent.queue.scheduled().len(), 1);

    let stored = agent.applications.find_all().unwrap();
    assert_eq!(stored[0].state(), ApplicationState::Pending);
}
