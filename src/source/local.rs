//! Local directory source.
//!
//! Backed by the process-wide filesystem; holds no session and is never
//! registered for teardown.

use super::{FileSource, SourceFile};
use std::path::{Path, PathBuf};

pub struct LocalSource {
    label: String,
    root: PathBuf,
}

impl LocalSource {
    pub fn new(label: &str, root: &str) -> Self {
        Self {
            label: label.to_string(),
            root: PathBuf::from(root),
        }
    }
}

impl FileSource for LocalSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn list(&self) -> Result<Vec<SourceFile>, String> {
        let mut files = Vec::new();
        walk(&self.root, &self.root, &mut files)?;
        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(files)
    }

    fn fetch(&self, rel_path: &str, dest: &Path) -> Result<u64, String> {
        let src = self.root.join(rel_path);
        std::fs::copy(&src, dest)
            .map_err(|e| format!("cannot copy {} → {}: {}", src.display(), dest.display(), e))
    }
}

/// Sorted recursive walk, relative paths, symlinks skipped.
fn walk(base: &Path, current: &Path, files: &mut Vec<SourceFile>) -> Result<(), String> {
    let read_dir = std::fs::read_dir(current)
        .map_err(|e| format!("cannot read dir {}: {}", current.display(), e))?;
    let mut children: Vec<std::fs::DirEntry> = read_dir.filter_map(|e| e.ok()).collect();
    children.sort_by_key(|e| e.file_name());

    for entry in children {
        let ft = entry
            .file_type()
            .map_err(|e| format!("stat error: {}", e))?;
        if ft.is_symlink() {
            continue;
        }
        let path = entry.path();
        if ft.is_file() {
            let rel_path = path
                .strip_prefix(base)
                .map_err(|e| format!("path prefix error: {}", e))?
                .to_string_lossy()
                .to_string();
            let size = entry
                .metadata()
                .map_err(|e| format!("stat error {}: {}", path.display(), e))?
                .len();
            files.push(SourceFile { rel_path, size });
        } else if ft.is_dir() {
            walk(base, &path, files)?;
        }
    }
    Ok(())
}
