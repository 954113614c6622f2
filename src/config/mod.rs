// src/config/mod.rs

//! Agent configuration
//!
//! Two layers with different lifetimes:
//!
//! - [`AgentConfig`]: the operator-provided TOML file (bind address, paths,
//!   hook execution settings), read once at startup
//! - [`MasterConfig`]: controller-connection credentials persisted as JSON
//!   by the `register` command and consulted on every authenticated request

use crate::error::{Error, Result};
use crate::installer::InstallerSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use std::time::Duration;
use tracing::debug;

/// TOML configuration file for the agent
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub hooks: HooksSection,

    #[serde(default)]
    pub deploy: DeploySection,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Bind address for the notification and info endpoints
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// `[paths]` section
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Root directory applications are installed under
    #[serde(default = "default_apps_root")]
    pub apps_root: PathBuf,

    /// Location of the persisted master credentials
    #[serde(default = "default_master_config")]
    pub master_config: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            apps_root: default_apps_root(),
            master_config: default_master_config(),
        }
    }
}

/// `[hooks]` section
#[derive(Debug, Clone, Deserialize)]
pub struct HooksSection {
    /// Interpreter for package hook scripts
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,

    /// Per-script timeout in seconds
    #[serde(default = "default_hook_timeout")]
    pub timeout_secs: u64,

    /// Mode for directories created during extraction
    #[serde(default = "default_dir_mode")]
    pub dir_create_mode: u32,
}

impl Default for HooksSection {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_secs: default_hook_timeout(),
            dir_create_mode: default_dir_mode(),
        }
    }
}

/// `[deploy]` section
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    /// Whether this node manages web-server virtual hosts
    #[serde(default = "default_true")]
    pub vhosts: bool,
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            vhosts: default_true(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:10072".to_string()
}

fn default_apps_root() -> PathBuf {
    PathBuf::from("/var/lib/deckhand/apps")
}

fn default_master_config() -> PathBuf {
    PathBuf::from("/etc/deckhand/master.json")
}

fn default_interpreter() -> PathBuf {
    PathBuf::from("/bin/sh")
}

fn default_hook_timeout() -> u64 {
    60
}

fn default_dir_mode() -> u32 {
    0o755
}

fn default_true() -> bool {
    true
}

impl AgentConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load from a file when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Installer settings derived from this configuration
    pub fn installer_settings(&self) -> InstallerSettings {
        InstallerSettings {
            apps_root: self.paths.apps_root.clone(),
            interpreter: self.hooks.interpreter.clone(),
            hook_timeout: Duration::from_secs(self.hooks.timeout_secs),
            dir_create_mode: self.hooks.dir_create_mode,
        }
    }
}

/// Controller-connection credentials, as persisted on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterCredentials {
    pub node_id: Option<String>,
    pub node_secret: Option<String>,
    pub master_url: Option<String>,
    pub master_secret: Option<String>,
}

/// Persisted connection to the controller ("master")
///
/// Missing or unreadable files yield empty credentials: an unregistered
/// node is a normal condition, not an error.
pub struct MasterConfig {
    path: PathBuf,
    credentials: RwLock<MasterCredentials>,
}

impl MasterConfig {
    pub fn load<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let credentials = Self::read_file(&path);
        Self {
            path,
            credentials: RwLock::new(credentials),
        }
    }

    fn read_file(path: &Path) -> MasterCredentials {
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!("Ignoring malformed master config {}: {}", path.display(), e);
                MasterCredentials::default()
            }),
            Err(_) => MasterCredentials::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MasterCredentials> {
        match self.credentials.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store freshly issued credentials and persist them
    pub fn create(
        &self,
        node_id: String,
        node_secret: String,
        master_url: String,
        master_secret: String,
    ) -> Result<()> {
        let credentials = MasterCredentials {
            node_id: Some(node_id),
            node_secret: Some(node_secret),
            master_url: Some(master_url),
            master_secret: Some(master_secret),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&credentials)?;
        fs::write(&self.path, json).map_err(|e| {
            Error::Config(format!(
                "Could not write master config file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        match self.credentials.write() {
            Ok(mut guard) => *guard = credentials,
            Err(poisoned) => *poisoned.into_inner() = credentials,
        }
        Ok(())
    }

    /// Re-read credentials from disk
    pub fn reload(&self) {
        let credentials = Self::read_file(&self.path);
        match self.credentials.write() {
            Ok(mut guard) => *guard = credentials,
            Err(poisoned) => *poisoned.into_inner() = credentials,
        }
    }

    /// Forget the credentials and delete the file
    pub fn clear(&self) {
        match self.credentials.write() {
            Ok(mut guard) => *guard = MasterCredentials::default(),
            Err(poisoned) => *poisoned.into_inner() = MasterCredentials::default(),
        }
        let _ = fs::remove_file(&self.path);
    }

    pub fn node_id(&self) -> Option<String> {
        self.read().node_id.clone()
    }

    pub fn node_secret(&self) -> Option<String> {
        self.read().node_secret.clone()
    }

    pub fn master_url(&self) -> Option<String> {
        self.read().master_url.clone()
    }

    pub fn master_secret(&self) -> Option<String> {
        self.read().master_secret.clone()
    }

    /// All four credentials are present
    pub fn has_master(&self) -> bool {
        let creds = self.read();
        creds.node_id.is_some()
            && creds.node_secret.is_some()
            && creds.master_url.is_some()
            && creds.master_secret.is_some()
    }
}
