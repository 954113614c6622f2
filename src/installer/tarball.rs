// src/installer/tarball.rs

//! Installer for plain tar.gz packages
//!
//! The whole archive is extracted into the target directory; hook scripts
//! live inside the extracted tree under the package-declared scripts
//! directory. Rollback hooks fire on every version swept by a rollback,
//! with `DEPLOYMENT_ROLLBACK_TARGET` telling the script whether it runs on
//! the version being rolled back to.

use crate::archive::ArchiveExtractor;
use crate::error::Result;
use crate::package::Package;
use crate::script::{
    ENV_APP_BASEDIR, ENV_ROLLBACK_TARGET, ENV_WEB_ROOT, ScriptRunner, StageParams, StageScript,
    env_key,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Installer, StageSubscriber, ensure_clean_target, remove_target};

const STAGE_INSTALL: &str = "stage";
const STAGE_REMOVE: &str = "remove";
const STAGE_PRE_ACTIVATE: &str = "pre-activate";
const STAGE_POST_ACTIVATE: &str = "post-activate";
const STAGE_PRE_DEACTIVATE: &str = "pre-deactivate";
const STAGE_POST_DEACTIVATE: &str = "post-deactivate";
const STAGE_PRE_ROLLBACK: &str = "pre-rollback";
const STAGE_POST_ROLLBACK: &str = "post-rollback";

/// Installer for whole-archive tar.gz packages
pub struct TarballInstaller {
    package: Package,
    target: PathBuf,
    runner: ScriptRunner,
    dir_create_mode: u32,
}

impl TarballInstaller {
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
        }
    }

    /// Run a hook script from the extracted tree, if the package declares
    /// a scripts directory and the script exists
    fn trigger(
        &self,
        stage: &str,
        params: &StageParams,
        extra_env: &[(&str, String)],
    ) -> Result<()> {
        let Some(scripts_dir) = self.package.trimmed_scripts_dir() else {
            return Ok(());
        };

        let mut env: BTreeMap<String, String> = params
            .iter()
            .map(|(k, v)| (env_key(k), v.clone()))
            .collect();
        for (key, value) in extra_env {
            env.insert(key.to_string(), value.clone());
        }
        env.insert(
            ENV_APP_BASEDIR.to_string(),
            self.target.to_string_lossy().into_owned(),
        );
        env.insert(
            ENV_WEB_ROOT.to_string(),
            self.web_root().to_string_lossy().into_owned(),
        );

        self.runner.run(&StageScript {
            stage: stage.to_string(),
            path: self.target.join(scripts_dir).join(format!("{stage}.sh")),
            env,
        })
    }

    fn trigger_rollback(
        &self,
        stage: &str,
        params: &StageParams,
        is_rollback_target: bool,
    ) -> Result<()> {
        let flag = if is_rollback_target { "1" } else { "0" };
        self.trigger(stage, params, &[(ENV_ROLLBACK_TARGET, flag.to_string())])
    }
}

impl Installer for TarballInstaller {
    fn package(&self) -> &Package {
        &self.package
    }

    fn target_dir(&self) -> &Path {
        &self.target
    }

    fn install(&mut self, params: &StageParams) -> Result<()> {
        ensure_clean_target(&self.target, self.dir_create_mode)?;
        ArchiveExtractor::new(&self.package.archive).extract_all(&self.target)?;
        self.trigger(STAGE_INSTALL, params, &[])
    }

    fn remove(&mut self, params: &StageParams) -> Result<()> {
        // The remove script lives inside the tree, so it must run before the
        // tree is deleted; this format has no post-remove hook.
        self.trigger(STAGE_REMOVE, params, &[])?;
        remove_target(&self.target)
    }

    fn web_root(&self) -> PathBuf {
        match self.package.document_root.as_deref() {
            Some(root) if !root.trim_matches('/').is_empty() => {
                self.target.join(root.trim_matches('/'))
            }
            _ => self.target.clone(),
        }
    }

    fn stage_subscriber(&mut self) -> Option<&mut dyn StageSubscriber> {
        Some(self)
    }
}

impl StageSubscriber for TarballInstaller {
    fn before_activate(&mut self, params: &StageParams) -> Result<()> {
        self.trigger(STAGE_PRE_ACTIVATE, params, &[])
    }

    fn after_activate(&mut self, params: &StageParams) -> Result<()> {
        self.trigger(STAGE_POST_ACTIVATE, params, &[])
    }

    fn before_deactivate(&mut self, params: &StageParams) -> Result<()> {
        self.trigger(STAGE_PRE_DEACTIVATE, params, &[])
    }

    fn after_deactivate(&mut self, params: &StageParams) -> Result<()> {
        self.trigger(STAGE_POST_DEACTIVATE, params, &[])
    }

    fn before_rollback(&mut self, params: &StageParams, is_rollback_target: bool) -> Result<()> {
        self.trigger_rollback(STAGE_PRE_ROLLBACK, params, is_rollback_target)
    }

    fn after_rollback(&mut self, params: &StageParams, is_rollback_target: bool) -> Result<()> {
        self.trigger_rollback(STAGE_POST_ROLLBACK, params, is_rollback_target)
    }
}
