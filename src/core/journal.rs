//! Append-only JSONL journal of copy events.

use crate::core::types::{CopyEvent, TimestampedEvent};
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Generate an ISO 8601 UTC timestamp.
pub fn now_iso8601() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Derive the journal path for a dataset.
pub fn journal_path(state_dir: &Path, dataset: &str) -> PathBuf {
    state_dir.join(dataset).join("events.jsonl")
}

/// Append an event to the dataset's journal.
pub fn append_event(state_dir: &Path, dataset: &str, event: CopyEvent) -> Result<(), String> {
    let path = journal_path(state_dir, dataset);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("cannot create state dir: {}", e))?;
    }

    let te = TimestampedEvent {
        ts: now_iso8601(),
        event,
    };
    let json = serde_json::to_string(&te).map_err(|e| format!("JSON serialize error: {}", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open journal {}: {}", path.display(), e))?;

    writeln!(file, "{}", json).map_err(|e| format!("write error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_iso8601() {
        let ts = now_iso8601();
        assert!(ts.starts_with("20"));
        assert!(ts.ends_with('Z'));
        assert!(ts.contains('T'));
        assert_eq!(ts.len(), "2026-08-30T10:00:00Z".len());
    }

    #[test]
    fn test_generate_run_id() {
        let id = generate_run_id();
        assert!(id.starts_with("r-"));
        assert!(id.len() > 4);
    }

    #[test]
    fn test_journal_path() {
        let p = journal_path(Path::new("/state"), "photos");
        assert_eq!(p, PathBuf::from("/state/photos/events.jsonl"));
    }

    #[test]
    fn test_append_event() {
        let dir = tempfile::tempdir().unwrap();
        let event = CopyEvent::JobStarted {
            dataset: "photos".to_string(),
            run_id: "r-abc".to_string(),
            ferry_version: "0.1.0".to_string(),
        };
        append_event(dir.path(), "photos", event).unwrap();

        let content = std::fs::read_to_string(dir.path().join("photos/events.jsonl")).unwrap();
        assert!(content.contains("job_started"));
        assert!(content.contains("r-abc"));
    }

    #[test]
    fn test_append_multiple() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            let event = CopyEvent::FileCopied {
                dataset: "photos".to_string(),
                file: format!("f{}.jpg", i),
                bytes: 10,
                duration_seconds: 0.1,
                hash: "blake3:xxx".to_string(),
            };
            append_event(dir.path(), "photos", event).unwrap();
        }
        let content = std::fs::read_to_string(dir.path().join("photos/events.jsonl")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        // Each line is standalone JSON
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("ts").is_some());
        }
    }
}
