// src/archive/mod.rs

//! Package archive extraction
//!
//! Unpacks gzip-compressed tar archives onto a target directory, preserving
//! directory structure and file modes. Supports extracting either the whole
//! archive or only the entries below a declared sub-directory, with the
//! prefix stripped from the materialized paths.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::debug;

/// Extracts package archives onto local disk
///
/// The extractor is cheap to construct and opens the archive fresh for every
/// operation, so one value can serve multiple extraction passes.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    archive_path: PathBuf,
}

impl ArchiveExtractor {
    pub fn new<P: Into<PathBuf>>(archive_path: P) -> Self {
        Self {
            archive_path: archive_path.into(),
        }
    }

    fn open(&self) -> Result<Archive<GzDecoder<File>>> {
        let file = File::open(&self.archive_path).map_err(|e| {
            Error::Installation(format!(
                "Failed to open package archive {}: {}",
                self.archive_path.display(),
                e
            ))
        })?;

        Ok(Archive::new(GzDecoder::new(file)))
    }

    /// Extract the entire archive into the target directory
    pub fn extract_all(&self, target: &Path) -> Result<()> {
        let mut archive = self.open()?;
        fs::create_dir_all(target)?;

        archive.set_preserve_permissions(true);
        archive.unpack(target).map_err(|e| {
            Error::Installation(format!(
                "Failed to extract {} to {}: {}",
                self.archive_path.display(),
                target.display(),
                e
            ))
        })?;

        debug!("Extracted {} to {}", self.archive_path.display(), target.display());
        Ok(())
    }

    /// Extract only the entries below `subdir`, stripping the prefix
    ///
    /// Directories are created on demand with `dir_mode`; file contents are
    /// written verbatim with the mode recorded in the archive.
    pub fn extract_subdir(&self, target: &Path, subdir: &str, dir_mode: u32) -> Result<()> {
        let prefix = Path::new(subdir.trim_matches('/')).to_path_buf();
        let mut archive = self.open()?;

        fs::DirBuilder::new()
            .recursive(true)
            .mode(dir_mode)
            .create(target)?;

        for entry in archive.entries()? {
            let mut entry = entry?;
            let entry_path = entry.path()?.into_owned();

            let relative = match entry_path.strip_prefix(&prefix) {
                Ok(rel) if !rel.as_os_str().is_empty() => sanitize_entry_path(rel)?,
                _ => continue,
            };

            let target_path = target.join(&relative);

            if entry.header().entry_type().is_dir() {
                fs::DirBuilder::new()
                    .recursive(true)
                    .mode(dir_mode)
                    .create(&target_path)?;
                continue;
            }

            if !entry.header().entry_type().is_file() {
                debug!("Skipping non-regular archive entry: {}", entry_path.display());
                continue;
            }

            if let Some(parent) = target_path.parent() {
                fs::DirBuilder::new()
                    .recursive(true)
                    .mode(dir_mode)
                    .create(parent)?;
            }

            let mode = entry.header().mode().unwrap_or(0o644);
            let mut out = File::create(&target_path).map_err(|e| {
                Error::Installation(format!(
                    "Failed to create file {}: {}",
                    target_path.display(),
                    e
                ))
            })?;
            io::copy(&mut entry, &mut out)?;
            fs::set_permissions(&target_path, fs::Permissions::from_mode(mode))?;
        }

        Ok(())
    }
}

/// Normalize an archive entry path, rejecting traversal components
pub fn sanitize_entry_path(path: &Path) -> Result<PathBuf> {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                return Err(Error::Installation(format!(
                    "Archive entry escapes target directory: {}",
                    path.display()
                )));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::Installation(format!(
            "Empty archive entry path: {}",
            path.display()
        )));
    }

    Ok(normalized)
}
