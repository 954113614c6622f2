// src/installer/kit.rs

//! Installer for structured "kit" packages
//!
//! A kit archive declares an application sub-directory and a scripts
//! sub-directory. Only the application sub-path is materialized into the
//! target; the scripts sub-path is extracted to an isolated temporary
//! directory on first hook invocation so that pre-install hooks can run
//! before anything exists in the target. The temporary extraction is
//! memoized for the instance's lifetime and deleted when the instance is
//! dropped, on every exit path.
//!
//! Unlike the tarball format, rollback hooks fire only on the version being
//! rolled back to; versions merely deactivated by the sweep are skipped.

use crate::archive::ArchiveExtractor;
use crate::error::Result;
use crate::package::Package;
use crate::script::{
    ENV_APP_BASEDIR, ENV_VERSION, ENV_WEB_ROOT, ScriptRunner, StageParams, StageScript, env_key,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::{Installer, StageSubscriber, ensure_clean_target, remove_target};

const STAGE_PRE_INSTALL: &str = "pre_stage";
const STAGE_POST_INSTALL: &str = "post_stage";
const STAGE_PRE_ACTIVATE: &str = "pre_activate";
const STAGE_POST_ACTIVATE: &str = "post_activate";
const STAGE_PRE_DEACTIVATE: &str = "pre_deactivate";
const STAGE_POST_DEACTIVATE: &str = "post_deactivate";
const STAGE_PRE_REMOVE: &str = "pre_remove";
const STAGE_POST_REMOVE: &str = "post_remove";
const STAGE_PRE_ROLLBACK: &str = "pre_rollback";
const STAGE_POST_ROLLBACK: &str = "post_rollback";

/// Installer for structured archives with an embedded scripts directory
pub struct KitInstaller {
    package: Package,
    target: PathBuf,
    runner: ScriptRunner,
    dir_create_mode: u32,
    /// Lazily extracted scripts directory; dropped with the instance
    extracted_scripts: Option<TempDir>,
}

impl KitInstaller {
    pub(crate) fn new(
        package: Package,
        target: PathBuf,
        runner: ScriptRunner,
        dir_create_mode: u32,
    ) -> Self {
        Self {
            package,
            target,
            runner,
            dir_create_mode,
            extracted_scripts: None,
        }
    }

    /// Extract the scripts sub-directory to a temporary location, once
    fn scripts_path(&mut self) -> Result<Option<PathBuf>> {
        let Some(scripts_dir) = self.package.trimmed_scripts_dir().map(String::from) else {
            return Ok(None);
        };

        if self.extracted_scripts.is_none() {
            let temp = TempDir::with_prefix("deckhand-scripts.")?;
            ArchiveExtractor::new(&self.package.archive).extract_subdir(
                temp.path(),
                &scripts_dir,
                self.dir_create_mode,
            )?;
            self.extracted_scripts = Some(temp);
        }

        Ok(self
            .extracted_scripts
            .as_ref()
            .map(|t| t.path().to_path_buf()))
    }

    /// Run a hook script from the temporary scripts extraction
    fn run_hook(&mut self, stage: &str, params: &StageParams) -> Result<()> {
        let Some(scripts) = self.scripts_path()? else {
            return Ok(());
        };

        let mut env: BTreeMap<String, String> = params
            .iter()
            .chain(self.package.variables.iter())
            .map(|(k, v)| (env_key(k), v.clone()))
            .collect();
        env.insert(
            ENV_APP_BASEDIR.to_string(),
            self.target.to_string_lossy().into_owned(),
        );
        env.insert(
            ENV_WEB_ROOT.to_string(),
            self.web_root().to_string_lossy().into_owned(),
        );
        env.insert(ENV_VERSION.to_string(), self.package.version.clone());

        self.runner.run(&StageScript {
            stage: stage.to_string(),
            path: scripts.join(format!("{stage}.sh")),
            env,
        })
    }
}

impl Installer for KitInstaller {
    fn package(&self) -> &Package {
        &self.package
    }

    fn target_dir(&self) -> &Path {
        &self.target
    }

    fn install(&mut self, params: &StageParams) -> Result<()> {
        self.run_hook(STAGE_PRE_INSTALL, params)?;

        ensure_clean_target(&self.target, self.dir_create_mode)?;
        let extractor = ArchiveExtractor::new(&self.package.archive);
        match self.package.trimmed_app_dir() {
            Some(app_dir) => extractor.extract_subdir(&self.target, app_dir, self.dir_create_mode)?,
            None => extractor.extract_all(&self.target)?,
        }

        self.run_hook(STAGE_POST_INSTALL, params)
    }

    fn remove(&mut self, params: &StageParams) -> Result<()> {
        self.run_hook(STAGE_PRE_REMOVE, params)?;
        remove_target(&self.target)?;
        self.run_hook(STAGE_POST_REMOVE, params)
    }

    fn web_root(&self) -> PathBuf {
        let Some(doc_root) = self
            .package
            .document_root
            .as_deref()
            .map(|r| r.trim_matches('/'))
            .filter(|r| !r.is_empty())
        else {
            return self.target.clone();
        };

        // A document root declared relative to the application sub-directory
        // is re-anchored to the target, where that sub-directory's contents
        // actually land.
        let doc_root = match self.package.trimmed_app_dir() {
            Some(app_dir) => doc_root
                .strip_prefix(&format!("{app_dir}/"))
                .unwrap_or(doc_root),
            None => doc_root,
        };

        self.target.join(doc_root)
    }

    fn stage_subscriber(&mut self) -> Option<&mut dyn StageSubscriber> {
        Some(self)
    }
}

impl StageSubscriber for KitInstaller {
    fn before_activate(&mut self, params: &StageParams) -> Result<()> {
        self.run_hook(STAGE_PRE_ACTIVATE, params)
    }

    fn after_activate(&mut self, params: &StageParams) -> Result<()> {
        self.run_hook(STAGE_POST_ACTIVATE, params)
    }

    fn before_deactivate(&mut self, params: &StageParams) -> Result<()> {
        self.run_hook(STAGE_PRE_DEACTIVATE, params)
    }

    fn after_deactivate(&mut self, params: &StageParams) -> Result<()> {
        self.run_hook(STAGE_POST_DEACTIVATE, params)
    }

    fn before_rollback(&mut self, params: &StageParams, is_rollback_target: bool) -> Result<()> {
        if is_rollback_target {
            self.run_hook(STAGE_PRE_ROLLBACK, params)?;
        }
        Ok(())
    }

    fn after_rollback(&mut self, params: &StageParams, is_rollback_target: bool) -> Result<()> {
        if is_rollback_target {
            self.run_hook(STAGE_POST_ROLLBACK, params)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::FORMAT_KIT;

    fn installer(app_dir: Option<&str>, document_root: Option<&str>) -> KitInstaller {
        let package = Package {
            name: "shop".to_string(),
            version: "2.0.0".to_string(),
            format: FORMAT_KIT.to_string(),
            archive: PathBuf::from("/tmp/shop.kit.tar.gz"),
            app_dir: app_dir.map(String::from),
            document_root: document_root.map(String::from),
            scripts_dir: Some("scripts".to_string()),
            extra: BTreeMap::new(),
            variables: BTreeMap::new(),
        };
        KitInstaller::new(
            package,
            PathBuf::from("/srv/apps/shop/2.0.0"),
            ScriptRunner::default(),
            0o755,
        )
    }

    #[test]
    fn web_root_strips_app_dir_prefix() {
        assert_eq!(
            installer(Some("data"), Some("data/public")).web_root(),
            PathBuf::from("/srv/apps/shop/2.0.0/public")
        );
    }

    #[test]
    fn web_root_keeps_unrelated_document_root() {
        assert_eq!(
            installer(Some("data"), Some("public")).web_root(),
            PathBuf::from("/srv/apps/shop/2.0.0/public")
        );
    }

    #[test]
    fn web_root_defaults_to_target() {
        assert_eq!(
            installer(Some("data"), None).web_root(),
            PathBuf::from("/srv/apps/shop/2.0.0")
        );
    }
}
