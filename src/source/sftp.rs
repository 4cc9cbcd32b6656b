//! SSH-session-backed remote source.
//!
//! Uses the `ssh`/`scp` binaries directly — no libssh2 dependency. A
//! session is an SSH control master held open for the life of the job;
//! listing runs over the shared connection and fetches ride it via
//! `ControlPath`. The session maintains remote state (the master
//! connection), so it implements [`Closeable`] and is registered with
//! the job's closer at acquisition.

use super::{ExecOutput, FileSource, SourceFile};
use crate::core::closer::Closeable;
use crate::core::types::Endpoint;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

pub struct SftpSession {
    label: String,
    target: String,
    root: String,
    key: Option<String>,
    control_path: PathBuf,
    closed: AtomicBool,
}

impl SftpSession {
    /// Open a control-master connection to the endpoint.
    pub fn open(id: &str, endpoint: &Endpoint) -> Result<Self, String> {
        let key = endpoint.ssh_key.as_deref().map(expand_key_path);
        let target = format!("{}@{}", endpoint.user, endpoint.addr);
        let control_path = new_control_path(id);

        // -M: master, -f -N: background without a remote command
        let mut cmd = Command::new("ssh");
        apply_common_opts(&mut cmd, key.as_deref());
        cmd.arg("-M")
            .arg("-S")
            .arg(&control_path)
            .args(["-f", "-N"])
            .arg(&target);

        let output = cmd
            .output()
            .map_err(|e| format!("failed to spawn ssh to {}: {}", endpoint.addr, e))?;
        if !output.status.success() {
            return Err(format!(
                "ssh master connection to {} failed: {}",
                target,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        debug!(target = %target, "opened ssh control master");

        Ok(Self {
            label: format!("sftp://{}", target),
            target,
            root: endpoint.root.clone(),
            key,
            control_path,
            closed: AtomicBool::new(false),
        })
    }

    /// Run a shell script over the session. Script is piped to stdin
    /// (not passed as argument) to avoid argument length limits and
    /// injection vectors.
    fn run(&self, script: &str) -> Result<ExecOutput, String> {
        let mut cmd = Command::new("ssh");
        apply_common_opts(&mut cmd, self.key.as_deref());
        cmd.arg("-S")
            .arg(&self.control_path)
            .arg(&self.target)
            .arg("bash")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("failed to spawn ssh to {}: {}", self.target, e))?;

        if let Some(ref mut stdin) = child.stdin {
            stdin
                .write_all(script.as_bytes())
                .map_err(|e| format!("stdin write error: {}", e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| format!("ssh wait error: {}", e))?;

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

impl FileSource for SftpSession {
    fn label(&self) -> &str {
        &self.label
    }

    fn list(&self) -> Result<Vec<SourceFile>, String> {
        let script = format!("find '{}' -type f -printf '%s %P\\n'", self.root);
        let out = self.run(&script)?;
        if !out.success() {
            return Err(format!(
                "listing {} failed (exit {}): {}",
                self.label,
                out.exit_code,
                out.stderr.trim()
            ));
        }
        Ok(parse_listing(&out.stdout))
    }

    fn fetch(&self, rel_path: &str, dest: &Path) -> Result<u64, String> {
        let mut cmd = Command::new("scp");
        cmd.args(["-o", "BatchMode=yes"])
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg("-q");
        if let Some(ref key) = self.key {
            cmd.args(["-i", key]);
        }
        cmd.arg(format!("{}:{}/{}", self.target, self.root, rel_path))
            .arg(dest);

        let output = cmd
            .output()
            .map_err(|e| format!("failed to spawn scp from {}: {}", self.target, e))?;
        if !output.status.success() {
            return Err(format!(
                "scp {}:{} failed: {}",
                self.label,
                rel_path,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let size = std::fs::metadata(dest)
            .map_err(|e| format!("cannot stat {}: {}", dest.display(), e))?
            .len();
        Ok(size)
    }
}

impl Closeable for SftpSession {
    fn name(&self) -> &str {
        &self.label
    }

    fn close(&self) -> io::Result<()> {
        // Duplicate registration closes twice; the second is a no-op.
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let output = Command::new("ssh")
            .arg("-S")
            .arg(&self.control_path)
            .args(["-O", "exit"])
            .arg(&self.target)
            .output()?;

        if output.status.success() {
            debug!(target = %self.target, "closed ssh control master");
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "ssh -O exit failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// Parse `find -printf '%s %P\n'` output into a sorted listing.
fn parse_listing(stdout: &str) -> Vec<SourceFile> {
    let mut files: Vec<SourceFile> = stdout
        .lines()
        .filter_map(|line| {
            let (size, rel_path) = line.split_once(' ')?;
            let size = size.parse().ok()?;
            if rel_path.is_empty() {
                return None;
            }
            Some(SourceFile {
                rel_path: rel_path.to_string(),
                size,
            })
        })
        .collect();
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    files
}

/// Build a control socket path unique to this session. Two sessions to
/// the same endpoint within one process must not share a socket.
fn new_control_path(id: &str) -> PathBuf {
    static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);
    let nonce = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("ferry-{}-{}-{}.ctl", std::process::id(), id, nonce))
}

/// Expand a leading `~/` to the home directory.
fn expand_key_path(key: &str) -> String {
    if let Some(rest) = key.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{}/{}", home, rest);
        }
    }
    key.to_string()
}

fn apply_common_opts(cmd: &mut Command, key: Option<&str>) {
    cmd.args(["-o", "BatchMode=yes"])
        .args(["-o", "ConnectTimeout=5"])
        .args(["-o", "StrictHostKeyChecking=accept-new"]);
    if let Some(key) = key {
        cmd.args(["-i", key]);
    }
}
