// src/installer/provider.rs

//! Installer resolution and prototype caching
//!
//! The provider maps a package's format tag to the installer implementation
//! for it. A format's template is constructed once through the
//! [`InstallerResolver`] collaborator and cached for the life of the
//! process; every [`InstallerProvider::installer_for`] call stamps out a
//! fresh, independent installer from the cached template, so concurrent and
//! sequential operations never share mutable installer state.

use crate::error::{Error, Result};
use crate::package::{FORMAT_KIT, FORMAT_TARBALL, Package};
use crate::script::ScriptRunner;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::kit::KitInstaller;
use super::tarball::TarballInstaller;
use super::{Installer, InstallerSettings, resolve_target_dir};

/// A format-level installer template
///
/// Templates hold only format configuration, never per-operation state;
/// [`InstallerTemplate::instantiate`] produces the short-lived stateful
/// installer bound to one package and target directory.
pub trait InstallerTemplate: Send + Sync {
    /// The format tag this template produces installers for
    fn format(&self) -> &str;

    /// Create a fresh installer bound to the given package
    fn instantiate(&self, package: &Package) -> Box<dyn Installer>;
}

/// Constructs installer templates for registered formats
pub trait InstallerResolver: Send + Sync {
    fn resolve(&self, format: &str) -> Result<Box<dyn InstallerTemplate>>;
}

/// Template for the tarball format
struct TarballTemplate {
    settings: InstallerSettings,
}

impl InstallerTemplate for TarballTemplate {
    fn format(&self) -> &str {
        FORMAT_TARBALL
    }

    fn instantiate(&self, package: &Package) -> Box<dyn Installer> {
        let target = resolve_target_dir(&self.settings.apps_root, package);
        let runner = ScriptRunner::new(&self.settings.interpreter, self.settings.hook_timeout);
        Box::new(TarballInstaller::new(
            package.clone(),
            target,
            runner,
            self.settings.dir_create_mode,
        ))
    }
}

/// Template for the kit format
struct KitTemplate {
    settings: InstallerSettings,
}

impl InstallerTemplate for KitTemplate {
    fn format(&self) -> &str {
        FORMAT_KIT
    }

    fn instantiate(&self, package: &Package) -> Box<dyn Installer> {
        let target = resolve_target_dir(&self.settings.apps_root, package);
        let runner = ScriptRunner::new(&self.settings.interpreter, self.settings.hook_timeout);
        Box::new(KitInstaller::new(
            package.clone(),
            target,
            runner,
            self.settings.dir_create_mode,
        ))
    }
}

/// Default resolver backing the built-in formats
pub struct SettingsResolver {
    settings: InstallerSettings,
}

impl SettingsResolver {
    pub fn new(settings: InstallerSettings) -> Self {
        Self { settings }
    }
}

impl InstallerResolver for SettingsResolver {
    fn resolve(&self, format: &str) -> Result<Box<dyn InstallerTemplate>> {
        match format {
            FORMAT_TARBALL => Ok(Box::new(TarballTemplate {
                settings: self.settings.clone(),
            })),
            FORMAT_KIT => Ok(Box::new(KitTemplate {
                settings: self.settings.clone(),
            })),
            other => Err(Error::UnsupportedPackageType(other.to_string())),
        }
    }
}

/// Resolves the installer implementation for a package
pub struct InstallerProvider {
    resolver: Box<dyn InstallerResolver>,
    registered: Vec<String>,
    prototypes: Mutex<HashMap<String, Arc<dyn InstallerTemplate>>>,
}

impl InstallerProvider {
    /// Create a provider with the built-in formats registered
    pub fn new(resolver: Box<dyn InstallerResolver>) -> Self {
        Self {
            resolver,
            registered: vec![FORMAT_TARBALL.to_string(), FORMAT_KIT.to_string()],
            prototypes: Mutex::new(HashMap::new()),
        }
    }

    /// Create a provider over the default resolver and the given settings
    pub fn with_settings(settings: InstallerSettings) -> Self {
        Self::new(Box::new(SettingsResolver::new(settings)))
    }

    /// Register an additional format tag
    pub fn register<S: Into<String>>(&mut self, format: S) {
        let format = format.into();
        if !self.registered.contains(&format) {
            self.registered.push(format);
        }
    }

    /// Format tags this provider can resolve
    pub fn supported_formats(&self) -> &[String] {
        &self.registered
    }

    /// Format tags with an already-constructed prototype
    pub fn cached_formats(&self) -> Vec<String> {
        self.lock_prototypes().keys().cloned().collect()
    }

    /// Resolve a fresh installer instance for the package's format
    pub fn installer_for(&self, package: &Package) -> Result<Box<dyn Installer>> {
        let format = package.format.as_str();

        if !self.registered.iter().any(|f| f == format) {
            return Err(Error::UnsupportedPackageType(format.to_string()));
        }

        let template = {
            let mut cache = self.lock_prototypes();
            match cache.get(format) {
                Some(template) => Arc::clone(template),
                None => {
                    let template = self.resolver.resolve(format)?;
                    if template.format() != format {
                        return Err(Error::InvalidInstaller(format!(
                            "Template for \"{}\" declares format \"{}\"",
                            format,
                            template.format()
                        )));
                    }
                    let template: Arc<dyn InstallerTemplate> = Arc::from(template);
                    cache.insert(format.to_string(), Arc::clone(&template));
                    template
                }
            }
        };

        Ok(template.instantiate(package))
    }

    fn lock_prototypes(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn InstallerTemplate>>> {
        match self.prototypes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
