//! Plan generation — diff a source listing against the dataset manifest.

use super::types::*;
use crate::source::SourceFile;

/// Generate a copy plan for one dataset by comparing the source listing
/// to the manifest from previous runs.
pub fn plan(
    dataset_id: &str,
    dataset: &Dataset,
    files: &[SourceFile],
    manifest: Option<&CopyManifest>,
) -> Result<CopyPlan, String> {
    let patterns = compile_includes(dataset)?;

    let mut changes = Vec::new();
    let mut to_copy = 0u32;
    let mut to_refresh = 0u32;
    let mut unchanged = 0u32;

    for file in files {
        if !matches_include(&file.rel_path, &patterns) {
            continue;
        }

        let action = determine_action(file, manifest);
        let description = describe_action(file, &action);

        match action {
            PlanAction::Copy => to_copy += 1,
            PlanAction::Refresh => to_refresh += 1,
            PlanAction::NoOp => unchanged += 1,
        }

        changes.push(PlannedCopy {
            dataset: dataset_id.to_string(),
            rel_path: file.rel_path.clone(),
            size: file.size,
            action,
            description,
        });
    }

    Ok(CopyPlan {
        dataset: dataset_id.to_string(),
        changes,
        to_copy,
        to_refresh,
        unchanged,
    })
}

/// Compile the dataset's include patterns.
pub fn compile_includes(dataset: &Dataset) -> Result<Vec<glob::Pattern>, String> {
    dataset
        .include
        .iter()
        .map(|p| glob::Pattern::new(p).map_err(|e| format!("invalid include '{}': {}", p, e)))
        .collect()
}

fn matches_include(rel_path: &str, patterns: &[glob::Pattern]) -> bool {
    patterns.iter().any(|p| p.matches(rel_path))
}

/// Determine what action to take for a source file.
fn determine_action(file: &SourceFile, manifest: Option<&CopyManifest>) -> PlanAction {
    let Some(manifest) = manifest else {
        return PlanAction::Copy;
    };

    match manifest.files.get(&file.rel_path) {
        None => PlanAction::Copy,
        Some(entry) => {
            if entry.status != FileStatus::Copied {
                // Previously failed — try again.
                return PlanAction::Refresh;
            }
            if entry.size != file.size {
                return PlanAction::Refresh;
            }
            PlanAction::NoOp
        }
    }
}

/// Generate a human-readable description of a planned action.
fn describe_action(file: &SourceFile, action: &PlanAction) -> String {
    match action {
        PlanAction::Copy => format!("{}: copy ({} bytes)", file.rel_path, file.size),
        PlanAction::Refresh => format!("{}: refresh ({} bytes)", file.rel_path, file.size),
        PlanAction::NoOp => format!("{}: up to date", file.rel_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn dataset(include: &[&str]) -> Dataset {
        Dataset {
            from: "nas".to_string(),
            to: "vault".to_string(),
            include: include.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn listing(files: &[(&str, u64)]) -> Vec<SourceFile> {
        files
            .iter()
            .map(|(rel_path, size)| SourceFile {
                rel_path: rel_path.to_string(),
                size: *size,
            })
            .collect()
    }

    fn manifest_with(files: &[(&str, u64, FileStatus)]) -> CopyManifest {
        let mut map = IndexMap::new();
        for (rel_path, size, status) in files {
            map.insert(
                rel_path.to_string(),
                FileEntry {
                    size: *size,
                    hash: "blake3:xxx".to_string(),
                    copied_at: None,
                    duration_seconds: None,
                    status: status.clone(),
                },
            );
        }
        CopyManifest {
            schema: "1.0".to_string(),
            dataset: "photos".to_string(),
            generated_at: "2026-08-30T10:00:00Z".to_string(),
            generator: "ferry 0.1.0".to_string(),
            files: map,
        }
    }

    #[test]
    fn test_plan_no_manifest_copies_everything() {
        let files = listing(&[("a.txt", 3), ("sub/b.txt", 5)]);
        let plan = plan("docs", &dataset(&["**/*"]), &files, None).unwrap();
        assert_eq!(plan.to_copy, 2);
        assert_eq!(plan.to_refresh, 0);
        assert_eq!(plan.unchanged, 0);
        assert!(plan.changes.iter().all(|c| c.action == PlanAction::Copy));
    }

    #[test]
    fn test_plan_unchanged_same_size() {
        let files = listing(&[("a.txt", 3)]);
        let manifest = manifest_with(&[("a.txt", 3, FileStatus::Copied)]);
        let plan = plan("docs", &dataset(&["**/*"]), &files, Some(&manifest)).unwrap();
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.changes[0].action, PlanAction::NoOp);
    }

    #[test]
    fn test_plan_refresh_on_size_change() {
        let files = listing(&[("a.txt", 9)]);
        let manifest = manifest_with(&[("a.txt", 3, FileStatus::Copied)]);
        let plan = plan("docs", &dataset(&["**/*"]), &files, Some(&manifest)).unwrap();
        assert_eq!(plan.to_refresh, 1);
        assert_eq!(plan.changes[0].action, PlanAction::Refresh);
    }

    #[test]
    fn test_plan_refresh_after_failure() {
        let files = listing(&[("a.txt", 3)]);
        let manifest = manifest_with(&[("a.txt", 3, FileStatus::Failed)]);
        let plan = plan("docs", &dataset(&["**/*"]), &files, Some(&manifest)).unwrap();
        assert_eq!(plan.to_refresh, 1);
    }

    #[test]
    fn test_plan_new_file_alongside_unchanged() {
        let files = listing(&[("a.txt", 3), ("b.txt", 4)]);
        let manifest = manifest_with(&[("a.txt", 3, FileStatus::Copied)]);
        let plan = plan("docs", &dataset(&["**/*"]), &files, Some(&manifest)).unwrap();
        assert_eq!(plan.to_copy, 1);
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_plan_include_filter() {
        let files = listing(&[("a.txt", 3), ("b.log", 4), ("sub/c.txt", 5)]);
        let plan = plan("docs", &dataset(&["**/*.txt"]), &files, None).unwrap();
        let paths: Vec<_> = plan.changes.iter().map(|c| c.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "sub/c.txt"]);
    }

    #[test]
    fn test_plan_multiple_includes() {
        let files = listing(&[("a.txt", 3), ("b.log", 4), ("c.bin", 5)]);
        let plan = plan("docs", &dataset(&["*.txt", "*.log"]), &files, None).unwrap();
        assert_eq!(plan.changes.len(), 2);
    }

    #[test]
    fn test_plan_preserves_listing_order() {
        let files = listing(&[("b.txt", 1), ("a.txt", 2), ("c.txt", 3)]);
        let plan = plan("docs", &dataset(&["**/*"]), &files, None).unwrap();
        let paths: Vec<_> = plan.changes.iter().map(|c| c.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["b.txt", "a.txt", "c.txt"]);
    }

    #[test]
    fn test_compile_includes_invalid() {
        let result = plan("docs", &dataset(&["[bad"]), &[], None);
        assert!(result.is_err());
    }

    #[test]
    fn test_describe_action() {
        let file = SourceFile {
            rel_path: "a.txt".to_string(),
            size: 42,
        };
        assert_eq!(describe_action(&file, &PlanAction::Copy), "a.txt: copy (42 bytes)");
        assert_eq!(describe_action(&file, &PlanAction::NoOp), "a.txt: up to date");
    }
}
