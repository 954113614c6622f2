// src/entities/mod.rs

//! Deployment entities tracked on this node
//!
//! Application instances and virtual hosts are owned by their repositories;
//! the core only reads entity state and persists transitions through the
//! repository contracts. Whether an entity is out of sync is computed by
//! the entity itself from its desired vs. actual deployment; the core never
//! invents that answer.

use crate::error::{Error, Result};
use crate::package::Package;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle state of a deployment entity
///
/// `Deployed` and `Removed` are the only settled states; everything else
/// means work is pending or under way.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApplicationState {
    Pending,
    Staging,
    Deployed,
    Error,
    Removed,
}

impl ApplicationState {
    /// Whether this state is terminal (no deployment work outstanding)
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Deployed | Self::Removed)
    }
}

/// A versioned application deployment tracked on this node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationInstance {
    pub id: Uuid,
    pub name: String,
    state: ApplicationState,
    /// Version the controller wants deployed
    pub desired_version: Option<String>,
    /// Version currently on disk
    pub deployed_version: Option<String>,
    /// Descriptor of the desired package, when one is assigned
    #[serde(default)]
    pub package: Option<Package>,
}

impl ApplicationInstance {
    pub fn new(name: impl Into<String>, state: ApplicationState) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            state,
            desired_version: None,
            deployed_version: None,
            package: None,
        }
    }

    pub fn state(&self) -> ApplicationState {
        self.state
    }

    pub fn set_state(&mut self, state: ApplicationState) {
        self.state = state;
    }

    /// Desired and actual deployment differ
    pub fn is_out_of_sync(&self) -> bool {
        match &self.desired_version {
            Some(desired) => self.deployed_version.as_deref() != Some(desired.as_str()),
            None => false,
        }
    }
}

/// A virtual host configured on this node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VHost {
    pub id: Uuid,
    pub name: String,
    /// Digest of the configuration the controller wants applied
    pub desired_config: Option<String>,
    /// Digest of the configuration currently applied
    pub applied_config: Option<String>,
}

impl VHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            desired_config: None,
            applied_config: None,
        }
    }

    /// Desired and applied configuration differ
    pub fn is_out_of_sync(&self) -> bool {
        match &self.desired_config {
            Some(desired) => self.applied_config.as_deref() != Some(desired.as_str()),
            None => false,
        }
    }
}

/// Storage contract for application instances
pub trait ApplicationRepository: Send + Sync {
    fn find_all(&self) -> Result<Vec<ApplicationInstance>>;

    /// Persist a state transition made on an entity
    fn update_state(&self, application: &ApplicationInstance) -> Result<()>;
}

/// Storage contract for virtual hosts
pub trait VHostRepository: Send + Sync {
    fn find_all(&self) -> Result<Vec<VHost>>;
}

/// In-memory application repository
#[derive(Default)]
pub struct MemoryApplicationRepository {
    entries: RwLock<HashMap<Uuid, ApplicationInstance>>,
}

impl MemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, application: ApplicationInstance) {
        self.write().insert(application.id, application);
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, ApplicationInstance>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, ApplicationInstance>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ApplicationRepository for MemoryApplicationRepository {
    fn find_all(&self) -> Result<Vec<ApplicationInstance>> {
        let mut all: Vec<_> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    fn update_state(&self, application: &ApplicationInstance) -> Result<()> {
        let mut entries = self.write();
        match entries.get_mut(&application.id) {
            Some(stored) => {
                stored.set_state(application.state());
                Ok(())
            }
            None => Err(Error::Repository(format!(
                "Unknown application instance: {}",
                application.id
            ))),
        }
    }
}

/// In-memory virtual host repository
#[derive(Default)]
pub struct MemoryVHostRepository {
    entries: RwLock<HashMap<Uuid, VHost>>,
}

impl MemoryVHostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, vhost: VHost) {
        match self.entries.write() {
            Ok(mut guard) => {
                guard.insert(vhost.id, vhost);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(vhost.id, vhost);
            }
        }
    }
}

impl VHostRepository for MemoryVHostRepository {
    fn find_all(&self) -> Result<Vec<VHost>> {
        let guard = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut all: Vec<_> = guard.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_sync_follows_versions() {
        let mut app = ApplicationInstance::new("shop", ApplicationState::Deployed);
        assert!(!app.is_out_of_sync());

        app.desired_version = Some("2.0.0".to_string());
        assert!(app.is_out_of_sync());

        app.deployed_version = Some("2.0.0".to_string());
        assert!(!app.is_out_of_sync());
    }

    #[test]
    fn vhost_sync_follows_config_digest() {
        let mut vhost = VHost::new("shop.example.org");
        assert!(!vhost.is_out_of_sync());

        vhost.desired_config = Some("abc123".to_string());
        assert!(vhost.is_out_of_sync());

        vhost.applied_config = Some("abc123".to_string());
        assert!(!vhost.is_out_of_sync());
    }

    #[test]
    fn update_state_persists_transition() {
        let repo = MemoryApplicationRepository::new();
        let mut app = ApplicationInstance::new("shop", ApplicationState::Deployed);
        repo.insert(app.clone());

        app.set_state(ApplicationState::Pending);
        repo.update_state(&app).unwrap();

        let all = repo.find_all().unwrap();
        assert_eq!(all[0].state(), ApplicationState::Pending);
    }

    #[test]
    fn update_state_rejects_unknown_entity() {
        let repo = MemoryApplicationRepository::new();
        let app = ApplicationInstance::new("ghost", ApplicationState::Pending);
        assert!(matches!(
            repo.update_state(&app).unwrap_err(),
            Error::Repository(_)
        ));
    }

    #[test]
    fn state_labels_are_lowercase() {
        assert_eq!(ApplicationState::Deployed.to_string(), "deployed");
        assert_eq!(
            serde_json::to_string(&ApplicationState::Error).unwrap(),
            "\"error\""
        );
    }
}
