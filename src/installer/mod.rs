// src/installer/mod.rs

//! Package installation lifecycle engine
//!
//! An [`Installer`] turns a [`Package`] into on-disk application state and
//! drives its activation lifecycle. Installers are short-lived: one instance
//! exists per in-flight operation, bound to the one package and target
//! directory it resolved itself, and is dropped when the operation ends.
//! Temporary resources an instance acquired (such as an extracted scripts
//! directory) are released on drop regardless of success or failure.
//!
//! Two archive formats are supported:
//!
//! - [`tarball::TarballInstaller`] extracts the whole archive and runs hook
//!   scripts from inside the extracted tree
//! - [`kit::KitInstaller`] materializes only the declared application
//!   sub-path and runs hook scripts from an isolated temporary extraction

pub mod kit;
pub mod provider;
pub mod tarball;

use crate::error::{Error, Result};
use crate::package::Package;
use crate::script::{DEFAULT_TIMEOUT, StageParams};
use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use provider::{InstallerProvider, InstallerResolver, InstallerTemplate, SettingsResolver};

/// Capability contract implemented by every installer variant
pub trait Installer {
    /// The package this instance is bound to
    fn package(&self) -> &Package;

    /// The target directory this instance resolved for its package
    fn target_dir(&self) -> &Path;

    /// Extract the package payload and run the format's install hooks
    fn install(&mut self, params: &StageParams) -> Result<()>;

    /// Run remove hooks and delete the target directory
    ///
    /// Safe to call after a failed or partial install; a missing target
    /// directory is not an error.
    fn remove(&mut self, params: &StageParams) -> Result<()>;

    /// Effective served-document path for the installed package
    fn web_root(&self) -> PathBuf;

    /// Lifecycle stage hooks, for variants that subscribe to them
    fn stage_subscriber(&mut self) -> Option<&mut dyn StageSubscriber> {
        None
    }
}

impl std::fmt::Debug for dyn Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("package", &self.package().name)
            .field("target_dir", &self.target_dir())
            .finish()
    }
}

/// Optional hooks fired by the deploy strategy around lifecycle stages
///
/// `is_rollback_target` distinguishes the version being rolled back *to*
/// from versions merely deactivated during the same rollback sweep.
pub trait StageSubscriber {
    fn before_activate(&mut self, params: &StageParams) -> Result<()>;
    fn after_activate(&mut self, params: &StageParams) -> Result<()>;
    fn before_deactivate(&mut self, params: &StageParams) -> Result<()>;
    fn after_deactivate(&mut self, params: &StageParams) -> Result<()>;
    fn before_rollback(&mut self, params: &StageParams, is_rollback_target: bool) -> Result<()>;
    fn after_rollback(&mut self, params: &StageParams, is_rollback_target: bool) -> Result<()>;
}

/// Format-level installer configuration
///
/// Holds only configuration shared by every operation of a format; never
/// per-operation state. Templates carry one of these and stamp out a fresh
/// installer per operation from it.
#[derive(Debug, Clone)]
pub struct InstallerSettings {
    /// Root directory under which applications are installed
    pub apps_root: PathBuf,
    /// Interpreter for hook scripts
    pub interpreter: PathBuf,
    /// Timeout bound for each hook script invocation
    pub hook_timeout: Duration,
    /// Mode for directories created during extraction
    pub dir_create_mode: u32,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            apps_root: PathBuf::from("/var/lib/deckhand/apps"),
            interpreter: PathBuf::from("/bin/sh"),
            hook_timeout: DEFAULT_TIMEOUT,
            dir_create_mode: 0o755,
        }
    }
}

/// Resolve the target directory for a package under the applications root
pub(crate) fn resolve_target_dir(apps_root: &Path, package: &Package) -> PathBuf {
    apps_root.join(&package.name).join(&package.version)
}

/// Create the target directory, requiring it to be absent or empty
pub(crate) fn ensure_clean_target(target: &Path, dir_mode: u32) -> Result<()> {
    if target.exists() {
        let occupied = fs::read_dir(target)?.next().is_some();
        if occupied {
            return Err(Error::Installation(format!(
                "Target directory is not empty: {}",
                target.display()
            )));
        }
        return Ok(());
    }

    fs::DirBuilder::new()
        .recursive(true)
        .mode(dir_mode)
        .create(target)?;
    Ok(())
}

/// Delete the target directory tree, tolerating its absence
pub(crate) fn remove_target(target: &Path) -> Result<()> {
    if target.exists() {
        fs::remove_dir_all(target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::FORMAT_TARBALL;
    use std::collections::BTreeMap;

    fn package() -> Package {
        Package {
            name: "shop".to_string(),
            version: "1.0.0".to_string(),
            format: FORMAT_TARBALL.to_string(),
            archive: PathBuf::from("/tmp/shop.tar.gz"),
            app_dir: None,
            document_root: None,
            scripts_dir: None,
            extra: BTreeMap::new(),
            variables: BTreeMap::new(),
        }
    }

    #[test]
    fn target_dir_is_name_and_version_under_root() {
        let target = resolve_target_dir(Path::new("/srv/apps"), &package());
        assert_eq!(target, PathBuf::from("/srv/apps/shop/1.0.0"));
    }

    #[test]
    fn clean_target_accepts_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b");

        ensure_clean_target(&target, 0o755).unwrap();
        assert!(target.is_dir());
        // Second call on the now-existing empty directory still passes
        ensure_clean_target(&target, 0o755).unwrap();
    }

    #[test]
    fn clean_target_rejects_occupied_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("leftover"), b"x").unwrap();

        let err = ensure_clean_target(dir.path(), 0o755).unwrap_err();
        assert!(matches!(err, Error::Installation(_)));
    }

    #[test]
    fn remove_target_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        remove_target(&dir.path().join("never-created")).unwrap();
    }
}
