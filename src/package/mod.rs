// src/package/mod.rs

//! Deployable package descriptors
//!
//! A [`Package`] is the immutable description of a versioned application
//! artifact: which archive format it uses, where the archive lives on disk,
//! and the layout the archive declares (application sub-directory, document
//! root, scripts sub-directory). It is loaded once per installation attempt
//! and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Format tag for plain tar.gz archives extracted whole into the target
pub const FORMAT_TARBALL: &str = "tarball";

/// Format tag for structured archives with an embedded scripts directory
pub const FORMAT_KIT: &str = "kit";

/// Immutable descriptor of a deployable artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Application name, unique per node
    pub name: String,

    /// Version identifier, opaque to the agent
    pub version: String,

    /// Archive format tag (see [`FORMAT_TARBALL`], [`FORMAT_KIT`])
    pub format: String,

    /// Location of the package archive on local disk
    pub archive: PathBuf,

    /// Application sub-directory inside the archive (kit packages)
    #[serde(default)]
    pub app_dir: Option<String>,

    /// Web document root, relative to the extracted tree
    #[serde(default)]
    pub document_root: Option<String>,

    /// Scripts sub-directory holding lifecycle hook scripts
    #[serde(default)]
    pub scripts_dir: Option<String>,

    /// Extra string metadata declared by the package
    #[serde(default)]
    pub extra: BTreeMap<String, String>,

    /// Runtime variables handed to hook scripts
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Package {
    /// Look up a value from the extra metadata map
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(|s| s.as_str())
    }

    /// Application sub-directory with surrounding slashes trimmed
    pub fn trimmed_app_dir(&self) -> Option<&str> {
        self.app_dir
            .as_deref()
            .map(|d| d.trim_matches('/'))
            .filter(|d| !d.is_empty())
    }

    /// Scripts sub-directory with surrounding slashes trimmed
    pub fn trimmed_scripts_dir(&self) -> Option<&str> {
        self.scripts_dir
            .as_deref()
            .map(|d| d.trim_matches('/'))
            .filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(app_dir: Option<&str>, scripts_dir: Option<&str>) -> Package {
        Package {
            name: "shop".to_string(),
            version: "2.4.1".to_string(),
            format: FORMAT_KIT.to_string(),
            archive: PathBuf::from("/var/cache/deckhand/shop-2.4.1.tar.gz"),
            app_dir: app_dir.map(String::from),
            document_root: Some("public".to_string()),
            scripts_dir: scripts_dir.map(String::from),
            extra: BTreeMap::new(),
            variables: BTreeMap::new(),
        }
    }

    #[test]
    fn trimmed_dirs_strip_slashes() {
        let pkg = package(Some("/data/"), Some("scripts/"));
        assert_eq!(pkg.trimmed_app_dir(), Some("data"));
        assert_eq!(pkg.trimmed_scripts_dir(), Some("scripts"));
    }

    #[test]
    fn empty_dirs_collapse_to_none() {
        let pkg = package(Some("//"), None);
        assert_eq!(pkg.trimmed_app_dir(), None);
        assert_eq!(pkg.trimmed_scripts_dir(), None);
    }

    #[test]
    fn descriptor_roundtrips_through_json() {
        let pkg = package(Some("data"), Some("scripts"));
        let json = serde_json::to_string(&pkg).unwrap();
        let back: Package = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "shop");
        assert_eq!(back.trimmed_app_dir(), Some("data"));
    }
}
