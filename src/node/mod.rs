// src/node/mod.rs

//! Node-wide state aggregation
//!
//! The node reports a single aggregate state to the controller, derived
//! from the states of all tracked application instances. The aggregate is
//! recomputed on every query and never cached across calls.

use crate::entities::{ApplicationRepository, ApplicationState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tracing::warn;

/// Aggregate health of this node, as reported to the controller
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeState {
    /// No deployment entities are tracked yet
    Uninitialized,
    Ready,
    Building,
    Failure,
}

impl NodeState {
    /// Fold one application's state into the running node state
    ///
    /// Failure is sticky: once observed it cannot regress within the same
    /// pass. Any application that is not deployed keeps the node building.
    pub fn fold(self, application: ApplicationState) -> NodeState {
        if self == NodeState::Failure || application == ApplicationState::Error {
            return NodeState::Failure;
        }

        if application != ApplicationState::Deployed {
            return NodeState::Building;
        }

        self
    }
}

/// Compute the aggregate node state from all tracked applications
///
/// Starts from `Uninitialized`; the first tracked application raises the
/// floor to `Ready`. An `Error` application short-circuits to `Failure`.
/// Any unsettled application raises the running state to `Building`, but
/// scanning continues since a later application could still force failure.
pub fn aggregate_state(repository: &dyn ApplicationRepository) -> NodeState {
    let applications = match repository.find_all() {
        Ok(applications) => applications,
        Err(e) => {
            warn!("Failed to enumerate applications for state aggregation: {e}");
            return NodeState::Failure;
        }
    };

    let mut state = NodeState::Uninitialized;

    for application in &applications {
        if state == NodeState::Uninitialized {
            state = NodeState::Ready;
        }

        match application.state() {
            ApplicationState::Error => return NodeState::Failure,
            s if !s.is_settled() => state = NodeState::Building,
            _ => {}
        }
    }

    state
}

/// Identity and health payload served on the info endpoint
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub id: Option<String>,
    pub state: NodeState,
    pub version: String,
}

/// Produces the node's info payload
///
/// The aggregate state is recomputed on every call; stale answers here
/// would mislead the controller's scheduling.
pub struct NodeInfo {
    node_id: Option<String>,
    version: String,
    applications: Arc<dyn ApplicationRepository>,
}

impl NodeInfo {
    pub fn new(
        node_id: Option<String>,
        version: impl Into<String>,
        applications: Arc<dyn ApplicationRepository>,
    ) -> Self {
        Self {
            node_id,
            version: version.into(),
            applications,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    pub fn state(&self) -> NodeState {
        aggregate_state(self.applications.as_ref())
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            id: self.node_id.clone(),
            state: self.state(),
            version: self.version.clone(),
        }
    }
}
