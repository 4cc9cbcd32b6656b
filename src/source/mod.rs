//! Source endpoint abstraction — local directories and SSH-session-backed
//! remote directories.

pub mod local;
pub mod sftp;

use crate::core::closer::ResourceCloser;
use crate::core::types::{Endpoint, Scheme};
use std::path::Path;
use std::sync::Arc;

/// Output from running a command on a remote target.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A file visible at a source endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the endpoint root
    pub rel_path: String,

    /// Size in bytes
    pub size: u64,
}

/// Read access to a source endpoint's files.
pub trait FileSource: Send + Sync {
    /// Stable label used in plan output and diagnostics.
    fn label(&self) -> &str;

    /// List all regular files under the endpoint root, sorted by
    /// relative path. Symlinks are skipped.
    fn list(&self) -> Result<Vec<SourceFile>, String>;

    /// Copy one file to a local destination path. Returns bytes copied.
    fn fetch(&self, rel_path: &str, dest: &Path) -> Result<u64, String>;
}

/// Connect to an endpoint, registering session-backed sources with the
/// job's closer at the point of acquisition.
///
/// Local sources hold no session state, are shared with the rest of the
/// process, and must never enter the closer's registry. An sftp source
/// owns a live SSH control-master connection exclusive to this job; it
/// is registered before being handed out, so teardown is guaranteed even
/// if the copy fails immediately after.
pub fn connect(
    id: &str,
    endpoint: &Endpoint,
    closer: &ResourceCloser,
) -> Result<Arc<dyn FileSource>, String> {
    match endpoint.scheme {
        Scheme::Local => {
            let source: Arc<dyn FileSource> = Arc::new(local::LocalSource::new(id, &endpoint.root));
            Ok(source)
        }
        Scheme::Sftp => {
            let session: Arc<dyn FileSource> = closer.register(sftp::SftpSession::open(id, endpoint)?);
            Ok(session)
        }
    }
}

/// Check if an address is this machine.
pub fn is_local_addr(addr: &str) -> bool {
    if addr == "127.0.0.1" || addr == "localhost" || addr == "::1" {
        return true;
    }
    if let Ok(hostname) = std::fs::read_to_string("/etc/hostname") {
        if addr == hostname.trim() {
            return true;
        }
    }
    false
}
