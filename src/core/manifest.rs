//! Manifest management — load, save (atomic), path derivation.

use super::journal::now_iso8601;
use super::types::CopyManifest;
use std::path::{Path, PathBuf};

/// Derive the manifest path for a dataset within the state directory.
pub fn manifest_path(state_dir: &Path, dataset: &str) -> PathBuf {
    state_dir.join(dataset).join("manifest.yaml")
}

/// Load a dataset's manifest. Returns None if the file doesn't exist.
pub fn load_manifest(state_dir: &Path, dataset: &str) -> Result<Option<CopyManifest>, String> {
    let path = manifest_path(state_dir, dataset);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let manifest: CopyManifest = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("invalid manifest {}: {}", path.display(), e))?;
    Ok(Some(manifest))
}

/// Save a manifest atomically (write to temp, then rename).
pub fn save_manifest(state_dir: &Path, manifest: &CopyManifest) -> Result<(), String> {
    let path = manifest_path(state_dir, &manifest.dataset);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create dir {}: {}", parent.display(), e))?;
    }

    let yaml =
        serde_yaml_ng::to_string(manifest).map_err(|e| format!("serialize error: {}", e))?;

    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml)
        .map_err(|e| format!("cannot write {}: {}", tmp_path.display(), e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| {
        format!(
            "cannot rename {} → {}: {}",
            tmp_path.display(),
            path.display(),
            e
        )
    })?;

    Ok(())
}

/// Create a new empty manifest for a dataset.
pub fn new_manifest(dataset: &str) -> CopyManifest {
    CopyManifest {
        schema: "1.0".to_string(),
        dataset: dataset.to_string(),
        generated_at: now_iso8601(),
        generator: format!("ferry {}", env!("CARGO_PKG_VERSION")),
        files: indexmap::IndexMap::new(),
    }
}
