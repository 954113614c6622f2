// src/jobs/mod.rs

//! Deployment job scheduling
//!
//! The synchronization pass enqueues corrective jobs; an out-of-scope
//! worker dequeues and executes them later. The queue is consumed as an
//! opaque scheduling collaborator: `schedule` is fire-and-forget, and
//! deduplication of repeated enqueues is the queue's own concern.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// A corrective deployment job, carrying the identity of its entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeployJob {
    Application { id: Uuid, name: String },
    VHost { id: Uuid, name: String },
}

impl DeployJob {
    pub fn entity_id(&self) -> Uuid {
        match self {
            Self::Application { id, .. } | Self::VHost { id, .. } => *id,
        }
    }
}

/// Scheduling contract consumed by the synchronization pass
pub trait JobQueue: Send + Sync {
    fn schedule(&self, job: DeployJob) -> Result<()>;
}

/// In-memory queue recording scheduled jobs for a worker to drain
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<Vec<DeployJob>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs scheduled so far, oldest first
    pub fn scheduled(&self) -> Vec<DeployJob> {
        self.lock().clone()
    }

    /// Take all scheduled jobs, leaving the queue empty
    pub fn drain(&self) -> Vec<DeployJob> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DeployJob>> {
        match self.jobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JobQueue for MemoryJobQueue {
    fn schedule(&self, job: DeployJob) -> Result<()> {
        self.lock().push(job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_jobs_are_recorded_in_order() {
        let queue = MemoryJobQueue::new();
        let a = DeployJob::Application {
            id: Uuid::new_v4(),
            name: "shop".to_string(),
        };
        let b = DeployJob::VHost {
            id: Uuid::new_v4(),
            name: "shop.example.org".to_string(),
        };

        queue.schedule(a.clone()).unwrap();
        queue.schedule(b.clone()).unwrap();

        assert_eq!(queue.scheduled(), vec![a, b]);
        assert_eq!(queue.drain().len(), 2);
        assert!(queue.scheduled().is_empty());
    }
}
