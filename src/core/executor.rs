//! Copy job orchestration.
//!
//! Runs datasets in declaration order: connect → list → plan → for each
//! planned file: fetch to a staged sibling → verify → rename → manifest +
//! journal. One [`ResourceCloser`] is created per job; every
//! session-backed source lands in it at acquisition and the terminal
//! `close_all` runs exactly once on the shutdown path, after all
//! datasets — success or failure.

use super::closer::ResourceCloser;
use super::journal;
use super::manifest;
use super::planner;
use super::types::*;
use super::verify;
use crate::source::{self, FileSource};
use std::path::Path;
use std::time::Instant;
use tracing::warn;

/// Configuration for a copy job run.
pub struct JobConfig<'a> {
    pub config: &'a FerryConfig,
    pub state_dir: &'a Path,
    pub force: bool,
    pub dry_run: bool,
    pub dataset_filter: Option<&'a str>,
}

/// Execute the copy job.
pub fn run(cfg: &JobConfig) -> Result<Vec<CopyResult>, String> {
    let closer = ResourceCloser::new();
    let result = run_datasets(cfg, &closer);

    // Terminal release: best-effort, exactly once, never skipped on
    // failure. Individual close failures were already logged by the
    // closer; summarize here and let policy decide whether they are
    // fatal.
    if let Err(e) = closer.close_all() {
        warn!(
            failures = e.failures().len(),
            error = %e,
            "session teardown failed"
        );
        if cfg.config.policy.strict_shutdown {
            return Err(format!("session teardown failed: {}", e));
        }
    }

    result
}

fn run_datasets(cfg: &JobConfig, closer: &ResourceCloser) -> Result<Vec<CopyResult>, String> {
    let mut results = Vec::new();

    for (id, dataset) in &cfg.config.datasets {
        if let Some(filter) = cfg.dataset_filter {
            if id != filter {
                continue;
            }
        }
        results.push(run_dataset(cfg, id, dataset, closer)?);
    }

    Ok(results)
}

fn run_dataset(
    cfg: &JobConfig,
    id: &str,
    dataset: &Dataset,
    closer: &ResourceCloser,
) -> Result<CopyResult, String> {
    let start = Instant::now();
    let run_id = journal::generate_run_id();
    let policy = &cfg.config.policy;

    let from = cfg
        .config
        .endpoints
        .get(&dataset.from)
        .ok_or_else(|| format!("dataset '{}' references unknown endpoint '{}'", id, dataset.from))?;
    let to = cfg
        .config
        .endpoints
        .get(&dataset.to)
        .ok_or_else(|| format!("dataset '{}' references unknown endpoint '{}'", id, dataset.to))?;

    let source = source::connect(&dataset.from, from, closer)?;
    let files = source.list()?;

    let existing = manifest::load_manifest(cfg.state_dir, id)?;
    let plan = planner::plan(id, dataset, &files, existing.as_ref())?;

    if cfg.dry_run {
        return Ok(CopyResult {
            dataset: id.to_string(),
            files_copied: 0,
            files_unchanged: plan.unchanged,
            files_failed: 0,
            total_duration: start.elapsed(),
        });
    }

    let mut man = existing.unwrap_or_else(|| manifest::new_manifest(id));
    let dest_root = Path::new(&to.root);

    log_journal(
        cfg.state_dir,
        id,
        policy.journal,
        CopyEvent::JobStarted {
            dataset: id.to_string(),
            run_id: run_id.clone(),
            ferry_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    );

    let mut copied = 0u32;
    let mut unchanged = 0u32;
    let mut failed = 0u32;

    for change in &plan.changes {
        if change.action == PlanAction::NoOp && !cfg.force {
            unchanged += 1;
            continue;
        }

        log_journal(
            cfg.state_dir,
            id,
            policy.journal,
            CopyEvent::FileStarted {
                dataset: id.to_string(),
                file: change.rel_path.clone(),
            },
        );

        let file_start = Instant::now();
        match copy_one(source.as_ref(), change, dest_root, policy.verify) {
            Ok((bytes, hash)) => {
                let duration = file_start.elapsed().as_secs_f64();
                man.files.insert(
                    change.rel_path.clone(),
                    FileEntry {
                        size: bytes,
                        hash: hash.clone(),
                        copied_at: Some(journal::now_iso8601()),
                        duration_seconds: Some(duration),
                        status: FileStatus::Copied,
                    },
                );
                log_journal(
                    cfg.state_dir,
                    id,
                    policy.journal,
                    CopyEvent::FileCopied {
                        dataset: id.to_string(),
                        file: change.rel_path.clone(),
                        bytes,
                        duration_seconds: duration,
                        hash,
                    },
                );
                copied += 1;
            }
            Err(error) => {
                warn!(dataset = id, file = %change.rel_path, error = %error, "copy failed");
                man.files.insert(
                    change.rel_path.clone(),
                    FileEntry {
                        size: change.size,
                        hash: String::new(),
                        copied_at: Some(journal::now_iso8601()),
                        duration_seconds: Some(file_start.elapsed().as_secs_f64()),
                        status: FileStatus::Failed,
                    },
                );
                log_journal(
                    cfg.state_dir,
                    id,
                    policy.journal,
                    CopyEvent::FileFailed {
                        dataset: id.to_string(),
                        file: change.rel_path.clone(),
                        error,
                    },
                );
                failed += 1;
                if policy.failure == FailurePolicy::StopOnFirst {
                    break;
                }
            }
        }
    }

    man.generated_at = journal::now_iso8601();
    if policy.manifest {
        manifest::save_manifest(cfg.state_dir, &man)?;
    }

    log_journal(
        cfg.state_dir,
        id,
        policy.journal,
        CopyEvent::JobCompleted {
            dataset: id.to_string(),
            run_id,
            files_copied: copied,
            files_unchanged: unchanged,
            files_failed: failed,
            total_seconds: start.elapsed().as_secs_f64(),
        },
    );

    Ok(CopyResult {
        dataset: id.to_string(),
        files_copied: copied,
        files_unchanged: unchanged,
        files_failed: failed,
        total_duration: start.elapsed(),
    })
}

/// Fetch one file through a staged sibling and rename into place.
/// Returns bytes copied and the recorded hash (empty when verify is off).
fn copy_one(
    source: &dyn FileSource,
    change: &PlannedCopy,
    dest_root: &Path,
    verify_hash: bool,
) -> Result<(u64, String), String> {
    let dest = dest_root.join(&change.rel_path);
    let parent = dest
        .parent()
        .ok_or_else(|| format!("destination {} has no parent", dest.display()))?;
    std::fs::create_dir_all(parent)
        .map_err(|e| format!("cannot create dir {}: {}", parent.display(), e))?;

    let file_name = dest
        .file_name()
        .ok_or_else(|| format!("destination {} has no file name", dest.display()))?
        .to_string_lossy()
        .to_string();
    // Dot-prefixed so the staging name can never collide with a copied
    // file: datasets may legitimately contain `{name}.partial`.
    let staged = parent.join(format!(".ferry-{}.partial", file_name));

    let result = source.fetch(&change.rel_path, &staged);
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            // Never leave a stale partial behind a failed fetch.
            let _ = std::fs::remove_file(&staged);
            return Err(e);
        }
    };

    let hash = if verify_hash {
        verify::hash_file(&staged)?
    } else {
        String::new()
    };

    std::fs::rename(&staged, &dest).map_err(|e| {
        format!(
            "cannot rename {} → {}: {}",
            staged.display(),
            dest.display(),
            e
        )
    })?;

    Ok((bytes, hash))
}

/// Append a journal event if journaling is enabled.
fn log_journal(state_dir: &Path, dataset: &str, journaling: bool, event: CopyEvent) {
    if journaling {
        let _ = journal::append_event(state_dir, dataset, event);
    }
}
