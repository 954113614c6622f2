// src/server/mod.rs

//! HTTP surface of the agent
//!
//! Exposes two controller-facing endpoints:
//!
//! - `GET /` - node identity and aggregated state
//! - `POST /notify` - run a synchronization pass, respond with the state
//!
//! Both are gated by the master-secret check in [`auth`].

pub mod auth;
pub mod routes;

use crate::config::{AgentConfig, MasterConfig};
use crate::entities::{
    ApplicationRepository, MemoryApplicationRepository, MemoryVHostRepository, VHostRepository,
};
use crate::error::Result;
use crate::jobs::{JobQueue, MemoryJobQueue};
use crate::node::NodeInfo;
use crate::sync::{DeployStrategy, DirectoryStrategy, SyncCoordinator, WebServerStrategy};
use std::sync::Arc;
use tracing::info;

/// Shared state behind the HTTP handlers
pub struct AgentState {
    pub info: NodeInfo,
    pub coordinator: Arc<SyncCoordinator>,
    pub master: Arc<MasterConfig>,
}

pub type SharedState = Arc<AgentState>;

impl AgentState {
    /// Wire up the serving state from the agent configuration
    pub fn from_config(config: &AgentConfig) -> Self {
        let applications: Arc<dyn ApplicationRepository> =
            Arc::new(MemoryApplicationRepository::new());
        let vhosts: Arc<dyn VHostRepository> = Arc::new(MemoryVHostRepository::new());
        let queue: Arc<dyn JobQueue> = Arc::new(MemoryJobQueue::new());
        let strategy: Arc<dyn DeployStrategy> = if config.deploy.vhosts {
            Arc::new(WebServerStrategy)
        } else {
            Arc::new(DirectoryStrategy)
        };

        let master = Arc::new(MasterConfig::load(&config.paths.master_config));

        Self::new(applications, vhosts, strategy, queue, master)
    }

    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        vhosts: Arc<dyn VHostRepository>,
        strategy: Arc<dyn DeployStrategy>,
        queue: Arc<dyn JobQueue>,
        master: Arc<MasterConfig>,
    ) -> Self {
        let info = NodeInfo::new(
            master.node_id(),
            env!("CARGO_PKG_VERSION"),
            Arc::clone(&applications),
        );
        let coordinator = Arc::new(SyncCoordinator::new(applications, vhosts, strategy, queue));

        Self {
            info,
            coordinator,
            master,
        }
    }
}

/// Serve the agent endpoints until the process is stopped
pub async fn serve(bind: &str, state: SharedState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Agent listening on {bind}");
    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
