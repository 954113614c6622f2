// src/script/mod.rs

//! Lifecycle hook script execution
//!
//! Packages may ship hook scripts keyed by lifecycle stage name. This module
//! runs them through a configurable interpreter with the deployment
//! parameters flattened into environment variables:
//!
//! - Each parameter key is sanitized to an identifier-safe uppercase token
//!   and prefixed with `DP_`
//! - `DEPLOYMENT_APP_BASEDIR` and `DEPLOYMENT_WEB_ROOT` are always set
//! - Rollback invocations may carry `DEPLOYMENT_ROLLBACK_TARGET`
//!
//! Execution is blocking with a timeout bound; a script that does not exit
//! in time is killed and reported as failed. The original platform had no
//! timeout at all, so a stuck hook blocked its operation indefinitely; the
//! explicit bound here is a hardening addition, not a behavior change.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Default timeout for hook script execution (60 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prefix for flattened deployment parameters
pub const ENV_PARAM_PREFIX: &str = "DP_";

/// Absolute application base directory of the current operation
pub const ENV_APP_BASEDIR: &str = "DEPLOYMENT_APP_BASEDIR";

/// Resolved web document root of the current operation
pub const ENV_WEB_ROOT: &str = "DEPLOYMENT_WEB_ROOT";

/// Package version of the current operation
pub const ENV_VERSION: &str = "DEPLOYMENT_VERSION";

/// `1` when the hook runs on the version being rolled back to, `0` otherwise
pub const ENV_ROLLBACK_TARGET: &str = "DEPLOYMENT_ROLLBACK_TARGET";

/// Deployment parameters passed through to hook scripts
pub type StageParams = BTreeMap<String, String>;

/// Sanitize a parameter key to an identifier-safe uppercase environment name
pub fn env_key(key: &str) -> String {
    static NON_IDENT: OnceLock<Regex> = OnceLock::new();
    let re = NON_IDENT.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("static regex"));

    format!(
        "{}{}",
        ENV_PARAM_PREFIX,
        re.replace_all(key.trim(), "_").to_uppercase()
    )
}

/// A hook script invocation, fully resolved by the calling installer
#[derive(Debug, Clone)]
pub struct StageScript {
    /// Lifecycle stage name, used for error reporting and log prefixes
    pub stage: String,
    /// Path of the script file; a missing file skips the stage
    pub path: PathBuf,
    /// Environment handed to the script in addition to the process env
    pub env: BTreeMap<String, String>,
}

/// Runs hook scripts through the configured interpreter
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    interpreter: PathBuf,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new<P: Into<PathBuf>>(interpreter: P, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute a stage script, skipping silently when the file is absent
    pub fn run(&self, script: &StageScript) -> Result<()> {
        if !script.path.is_file() {
            debug!("No {} script at {}, skipping", script.stage, script.path.display());
            return Ok(());
        }

        if !self.interpreter.exists() {
            return Err(Error::Installation(format!(
                "Hook interpreter not found: {}",
                self.interpreter.display()
            )));
        }

        info!("Running {} script: {}", script.stage, script.path.display());

        let mut child = Command::new(&self.interpreter)
            .arg(&script.path)
            .envs(&script.env)
            .current_dir(script.path.parent().unwrap_or(Path::new("/")))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Installation(format!(
                    "Failed to spawn {} script: {}",
                    script.stage, e
                ))
            })?;

        match child.wait_timeout(self.timeout)? {
            Some(status) => {
                let output = child.wait_with_output()?;
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);

                for line in stdout.lines() {
                    info!("[{}] {}", script.stage, line);
                }
                for line in stderr.lines() {
                    warn!("[{}] {}", script.stage, line);
                }

                if status.success() {
                    Ok(())
                } else {
                    Err(Error::StageScriptFailed {
                        stage: script.stage.clone(),
                        code: status.code().unwrap_or(-1),
                    })
                }
            }
            None => {
                let _ = child.kill();
                Err(Error::StageScriptTimeout {
                    stage: script.stage.clone(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new("/bin/sh", DEFAULT_TIMEOUT)
    }
}
