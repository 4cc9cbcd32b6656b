//! Schema types for the ferry configuration and state files.
//!
//! Defines the YAML schema for endpoints, datasets, policy, per-dataset
//! manifests, and journal events. All types derive Serialize/Deserialize
//! for YAML/JSON roundtripping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Top-level ferry.yaml
// ============================================================================

/// Root configuration — the datasets a copy job moves and where from/to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Human-readable job name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Named source/destination endpoints
    #[serde(default)]
    pub endpoints: IndexMap<String, Endpoint>,

    /// Dataset declarations (order-preserving)
    pub datasets: IndexMap<String, Dataset>,

    /// Execution policy
    #[serde(default)]
    pub policy: Policy,
}

// ============================================================================
// Endpoints
// ============================================================================

/// A filesystem endpoint: a local directory, or a remote directory reached
/// over a session-backed SSH connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Access scheme
    #[serde(default)]
    pub scheme: Scheme,

    /// Network address (IP or DNS); ignored for local endpoints
    #[serde(default = "default_addr")]
    pub addr: String,

    /// SSH user
    #[serde(default = "default_user")]
    pub user: String,

    /// Path to SSH private key
    #[serde(default)]
    pub ssh_key: Option<String>,

    /// Root directory files are read from or written to
    pub root: String,
}

fn default_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_user() -> String {
    "root".to_string()
}

/// Endpoint access scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    #[default]
    Local,
    Sftp,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Sftp => write!(f, "sftp"),
        }
    }
}

// ============================================================================
// Datasets
// ============================================================================

/// A set of files to copy from one endpoint to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Source endpoint name
    pub from: String,

    /// Destination endpoint name (must be a local endpoint)
    pub to: String,

    /// Include glob patterns, matched against paths relative to the
    /// source root
    #[serde(default = "default_include")]
    pub include: Vec<String>,
}

fn default_include() -> Vec<String> {
    vec!["**/*".to_string()]
}

// ============================================================================
// Policy
// ============================================================================

/// Execution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Failure handling within a dataset
    #[serde(default)]
    pub failure: FailurePolicy,

    /// Record a BLAKE3 hash of every copied file
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Append JSONL journal events on every run
    #[serde(default = "default_true")]
    pub journal: bool,

    /// Persist the per-dataset manifest after a run
    #[serde(default = "default_true")]
    pub manifest: bool,

    /// Treat a failed session teardown as a job failure instead of a
    /// logged warning
    #[serde(default)]
    pub strict_shutdown: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            failure: FailurePolicy::default(),
            verify: true,
            journal: true,
            manifest: true,
            strict_shutdown: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Failure handling strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    StopOnFirst,
    ContinueRemaining,
}

// ============================================================================
// Manifest
// ============================================================================

/// Per-dataset manifest of everything copied so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyManifest {
    /// Schema version
    pub schema: String,

    /// Dataset name
    pub dataset: String,

    /// When the manifest was generated
    pub generated_at: String,

    /// Generator version
    pub generator: String,

    /// Per-file state, keyed by path relative to the source root
    pub files: IndexMap<String, FileEntry>,
}

/// Per-file manifest entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// Source size in bytes at copy time
    pub size: u64,

    /// BLAKE3 hash of the copied file (empty when verify is off)
    pub hash: String,

    /// When the file was last copied
    #[serde(default)]
    pub copied_at: Option<String>,

    /// Duration of the last copy in seconds
    #[serde(default)]
    pub duration_seconds: Option<f64>,

    /// Copy status
    pub status: FileStatus,
}

/// Copy status of a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Copied,
    Failed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copied => write!(f, "COPIED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Action to take on a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Copy,
    Refresh,
    NoOp,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "COPY"),
            Self::Refresh => write!(f, "REFRESH"),
            Self::NoOp => write!(f, "NO-OP"),
        }
    }
}

/// A single planned file copy.
#[derive(Debug, Clone)]
pub struct PlannedCopy {
    /// Dataset the file belongs to
    pub dataset: String,

    /// Path relative to the source root
    pub rel_path: String,

    /// Source size in bytes
    pub size: u64,

    /// Action to take
    pub action: PlanAction,

    /// Human-readable description
    pub description: String,
}

/// Full copy plan for one dataset.
#[derive(Debug, Clone)]
pub struct CopyPlan {
    /// Dataset name
    pub dataset: String,

    /// Planned file copies in listing order
    pub changes: Vec<PlannedCopy>,

    /// Summary counts
    pub to_copy: u32,
    pub to_refresh: u32,
    pub unchanged: u32,
}

// ============================================================================
// Journal events
// ============================================================================

/// Journal event for the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CopyEvent {
    JobStarted {
        dataset: String,
        run_id: String,
        ferry_version: String,
    },
    FileStarted {
        dataset: String,
        file: String,
    },
    FileCopied {
        dataset: String,
        file: String,
        bytes: u64,
        duration_seconds: f64,
        hash: String,
    },
    FileFailed {
        dataset: String,
        file: String,
        error: String,
    },
    JobCompleted {
        dataset: String,
        run_id: String,
        files_copied: u32,
        files_unchanged: u32,
        files_failed: u32,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: CopyEvent,
}

// ============================================================================
// Copy result
// ============================================================================

/// Result of copying a single dataset.
#[derive(Debug, Clone)]
pub struct CopyResult {
    pub dataset: String,
    pub files_copied: u32,
    pub files_unchanged: u32,
    pub files_failed: u32,
    pub total_duration: std::time::Duration,
}

// ============================================================================
// Tests
// ============================================================================
