// src/sync/mod.rs

//! Node-state synchronization
//!
//! The controller notifies the node whenever desired state may have
//! changed; the [`SyncCoordinator`] then walks all locally tracked
//! deployment entities, enqueues corrective jobs for the out-of-sync ones,
//! and computes the node state to report back. This is a reconciliation
//! pass, not a transaction: calling it again before enqueued jobs ran may
//! enqueue duplicates, which the job queue is expected to absorb.

use crate::entities::{
    ApplicationRepository, ApplicationState, VHostRepository,
};
use crate::error::Result;
use crate::jobs::{DeployJob, JobQueue};
use crate::node::NodeState;
use std::sync::Arc;
use tracing::{debug, error, info};

/// How packages are activated on this node
///
/// The strategy itself executes out of scope; synchronization only asks
/// whether it manages virtual hosts at all.
pub trait DeployStrategy: Send + Sync {
    /// Virtual-host capability, for strategies that manage vhosts
    fn as_vhost_strategy(&self) -> Option<&dyn VHostDeployStrategy> {
        None
    }
}

/// Marker capability for strategies that drive virtual-host lifecycles
pub trait VHostDeployStrategy: DeployStrategy {}

/// Strategy serving applications behind node-managed virtual hosts
#[derive(Debug, Default)]
pub struct WebServerStrategy;

impl DeployStrategy for WebServerStrategy {
    fn as_vhost_strategy(&self) -> Option<&dyn VHostDeployStrategy> {
        Some(self)
    }
}

impl VHostDeployStrategy for WebServerStrategy {}

/// Strategy deploying applications to plain directories, no vhosts
#[derive(Debug, Default)]
pub struct DirectoryStrategy;

impl DeployStrategy for DirectoryStrategy {}

/// Reconciliation entry point invoked by the notification endpoint
pub struct SyncCoordinator {
    applications: Arc<dyn ApplicationRepository>,
    vhosts: Arc<dyn VHostRepository>,
    strategy: Arc<dyn DeployStrategy>,
    queue: Arc<dyn JobQueue>,
}

impl SyncCoordinator {
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        vhosts: Arc<dyn VHostRepository>,
        strategy: Arc<dyn DeployStrategy>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            applications,
            vhosts,
            strategy,
            queue,
        }
    }

    /// Run one synchronization pass and compute the node state to report
    ///
    /// Never fails outward: any error escaping the sweeps degrades the
    /// reported state to `Failure` instead of propagating.
    pub fn synchronize(&self) -> NodeState {
        match self.try_synchronize() {
            Ok(state) => state,
            Err(e) => {
                error!("Synchronization pass failed: {e}");
                NodeState::Failure
            }
        }
    }

    fn try_synchronize(&self) -> Result<NodeState> {
        let state = self.synchronize_vhosts(NodeState::Ready)?;
        self.synchronize_applications(state)
    }

    /// Enqueue deploy jobs for out-of-sync virtual hosts
    ///
    /// A no-op unless the bound strategy manages virtual hosts.
    fn synchronize_vhosts(&self, mut state: NodeState) -> Result<NodeState> {
        if self.strategy.as_vhost_strategy().is_none() {
            return Ok(state);
        }

        for vhost in self.vhosts.find_all()? {
            if !vhost.is_out_of_sync() {
                continue;
            }

            info!("VHost {} is out of sync, scheduling deployment", vhost.name);
            state = NodeState::Building;
            self.queue.schedule(DeployJob::VHost {
                id: vhost.id,
                name: vhost.name,
            })?;
        }

        Ok(state)
    }

    /// Enqueue deploy jobs for out-of-sync applications and fold their
    /// current states into the running node state
    fn synchronize_applications(&self, mut state: NodeState) -> Result<NodeState> {
        for mut application in self.applications.find_all()? {
            if application.is_out_of_sync() {
                info!(
                    "Application {} is out of sync, scheduling deployment",
                    application.name
                );
                application.set_state(ApplicationState::Pending);
                self.applications.update_state(&application)?;
                self.queue.schedule(DeployJob::Application {
                    id: application.id,
                    name: application.name.clone(),
                })?;
            } else {
                debug!("Application {} is in sync", application.name);
            }

            state = state.fold(application.state());
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        ApplicationInstance, MemoryApplicationRepository, MemoryVHostRepository, VHost,
    };
    use crate::error::Error;
    use crate::jobs::MemoryJobQueue;

    struct Fixture {
        applications: Arc<MemoryApplicationRepository>,
        vhosts: Arc<MemoryVHostRepository>,
        queue: Arc<MemoryJobQueue>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                applications: Arc::new(MemoryApplicationRepository::new()),
                vhosts: Arc::new(MemoryVHostRepository::new()),
                queue: Arc::new(MemoryJobQueue::new()),
            }
        }

        fn coordinator(&self, strategy: Arc<dyn DeployStrategy>) -> SyncCoordinator {
            SyncCoordinator::new(
                Arc::clone(&self.applications) as Arc<dyn ApplicationRepository>,
                Arc::clone(&self.vhosts) as Arc<dyn VHostRepository>,
                strategy,
                Arc::clone(&self.queue) as Arc<dyn JobQueue>,
            )
        }
    }

    fn out_of_sync_app(name: &str, state: ApplicationState) -> ApplicationInstance {
        let mut app = ApplicationInstance::new(name, state);
        app.desired_version = Some("2.0.0".to_string());
        app.deployed_version = Some("1.0.0".to_string());
        app
    }

    fn out_of_sync_vhost(name: &str) -> VHost {
        let mut vhost = VHost::new(name);
        vhost.desired_config = Some("abc".to_string());
        vhost
    }

    #[test]
    fn empty_node_reports_ready() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator(Arc::new(WebServerStrategy));
        assert_eq!(coordinator.synchronize(), NodeState::Ready);
        assert!(fixture.queue.scheduled().is_empty());
    }

    #[test]
    fn out_of_sync_application_is_marked_pending_and_scheduled() {
        let fixture = Fixture::new();
        fixture
            .applications
            .insert(out_of_sync_app("shop", ApplicationState::Deployed));

        let coordinator = fixture.coordinator(Arc::new(DirectoryStrategy));
        let state = coordinator.synchronize();

        assert_eq!(state, NodeState::Building);

        let jobs = fixture.queue.scheduled();
        assert_eq!(jobs.len(), 1);
        assert!(matches!(jobs[0], DeployJob::Application { .. }));

        let stored = fixture.applications.find_all().unwrap();
        assert_eq!(stored[0].state(), ApplicationState::Pending);
    }

    #[test]
    fn in_sync_entities_schedule_nothing_on_repeat_calls() {
        let fixture = Fixture::new();
        let app = ApplicationInstance::new("shop", ApplicationState::Deployed);
        fixture.applications.insert(app);

        let coordinator = fixture.coordinator(Arc::new(WebServerStrategy));
        assert_eq!(coordinator.synchronize(), NodeState::Ready);
        assert_eq!(coordinator.synchronize(), NodeState::Ready);
        assert!(fixture.queue.scheduled().is_empty());
    }

    #[test]
    fn vhost_sweep_requires_vhost_capable_strategy() {
        let fixture = Fixture::new();
        fixture.vhosts.insert(out_of_sync_vhost("shop.example.org"));

        let coordinator = fixture.coordinator(Arc::new(DirectoryStrategy));
        assert_eq!(coordinator.synchronize(), NodeState::Ready);
        assert!(fixture.queue.scheduled().is_empty());

        let coordinator = fixture.coordinator(Arc::new(WebServerStrategy));
        assert_eq!(coordinator.synchronize(), NodeState::Building);
        assert_eq!(fixture.queue.scheduled().len(), 1);
    }

    #[test]
    fn error_application_forces_failure() {
        let fixture = Fixture::new();
        fixture
            .applications
            .insert(ApplicationInstance::new("shop", ApplicationState::Error));
        fixture
            .applications
            .insert(ApplicationInstance::new("wiki", ApplicationState::Deployed));

        let coordinator = fixture.coordinator(Arc::new(WebServerStrategy));
        assert_eq!(coordinator.synchronize(), NodeState::Failure);
    }

    #[test]
    fn sweep_errors_are_contained_as_failure() {
        struct FailingQueue;

        impl JobQueue for FailingQueue {
            fn schedule(&self, _job: DeployJob) -> Result<()> {
                Err(Error::JobQueue("broker unreachable".to_string()))
            }
        }

        let fixture = Fixture::new();
        fixture
            .applications
            .insert(out_of_sync_app("shop", ApplicationState::Deployed));

        let coordinator = SyncCoordinator::new(
            Arc::clone(&fixture.applications) as Arc<dyn ApplicationRepository>,
            Arc::clone(&fixture.vhosts) as Arc<dyn VHostRepository>,
            Arc::new(WebServerStrategy),
            Arc::new(FailingQueue),
        );

        // The error must not escape; it only degrades the reported state.
        assert_eq!(coordinator.synchronize(), NodeState::Failure);
    }
}
