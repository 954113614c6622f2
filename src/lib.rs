// src/lib.rs

//! Deckhand Deployment Agent
//!
//! On-host agent of a distributed application-deployment platform. The
//! agent receives deployment intents from a remote controller, installs or
//! removes versioned application packages on local disk, runs
//! package-defined lifecycle hook scripts, and reports an aggregated node
//! state back to the controller.
//!
//! # Architecture
//!
//! - Installer variants per archive format, stamped out fresh per operation
//!   from format-level templates
//! - Synchronization as a reconciliation pass: detect out-of-sync entities,
//!   enqueue corrective jobs, report the resulting node state
//! - Entity repositories and the job queue are consumed as collaborators
//!   with their own consistency guarantees

pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod entities;
mod error;
pub mod installer;
pub mod jobs;
pub mod node;
pub mod package;
pub mod script;
pub mod server;
pub mod sync;

pub use entities::{
    ApplicationInstance, ApplicationRepository, ApplicationState, VHost, VHostRepository,
};
pub use error::{Error, Result};
pub use installer::{
    Installer, InstallerProvider, InstallerSettings, InstallerTemplate, StageSubscriber,
};
pub use jobs::{DeployJob, JobQueue};
pub use node::{NodeInfo, NodeState, NodeStatus, aggregate_state};
pub use package::{FORMAT_KIT, FORMAT_TARBALL, Package};
pub use script::{ScriptRunner, StageParams};
pub use sync::{DeployStrategy, SyncCoordinator, VHostDeployStrategy};
