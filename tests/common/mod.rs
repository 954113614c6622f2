// tests/common/mod.rs

//! Shared fixture builders for integration tests.

use deckhand::{FORMAT_KIT, FORMAT_TARBALL, Package};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Build a gzip-compressed tar archive from (path, content, mode) entries.
pub fn build_archive(path: &Path, entries: &[(&str, &str, u32)]) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (entry_path, content, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder
            .append_data(&mut header, entry_path, content.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
}

/// A hook script line that appends its stage and rollback flag to the log
/// file announced through the `DP_HOOK_LOG` parameter.
pub fn logging_hook(stage: &str) -> String {
    format!("echo \"{stage} rollback=${{DEPLOYMENT_ROLLBACK_TARGET:-}}\" >> \"$DP_HOOK_LOG\"\n")
}

pub fn tarball_package(name: &str, version: &str, archive: PathBuf) -> Package {
    Package {
        name: name.to_string(),
        version: version.to_string(),
        format: FORMAT_TARBALL.to_string(),
        archive,
        app_dir: None,
        document_root: Some("public".to_string()),
        scripts_dir: Some("deploy".to_string()),
        extra: BTreeMap::new(),
        variables: BTreeMap::new(),
    }
}

pub fn kit_package(name: &str, version: &str, archive: PathBuf) -> Package {
    Package {
        name: name.to_string(),
        version: version.to_string(),
        format: FORMAT_KIT.to_string(),
        archive,
        app_dir: Some("data".to_string()),
        document_root: Some("data/public".to_string()),
        scripts_dir: Some("scripts".to_string()),
        extra: BTreeMap::new(),
        variables: BTreeMap::new(),
    }
}

/// Stage params announcing the hook log file.
pub fn hook_params(log: &Path) -> deckhand::StageParams {
    let mut params = deckhand::StageParams::new();
    params.insert("hook-log".to_string(), log.display().to_string());
    params
}

/// Read the hook log, empty if no hook ever ran.
pub fn read_log(log: &Path) -> String {
    std::fs::read_to_string(log).unwrap_or_default()
}
