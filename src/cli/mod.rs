//! CLI subcommands — init, validate, plan, copy, status.

use crate::core::closer::ResourceCloser;
use crate::core::{executor, manifest, parser, planner, types};
use crate::source;
use clap::Subcommand;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new ferry project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate ferry.yaml without connecting to endpoints
    Validate {
        /// Path to ferry.yaml
        #[arg(short, long, default_value = "ferry.yaml")]
        file: PathBuf,
    },

    /// Show the copy plan (diff source listings against manifests)
    Plan {
        /// Path to ferry.yaml
        #[arg(short, long, default_value = "ferry.yaml")]
        file: PathBuf,

        /// Target a specific dataset
        #[arg(short, long)]
        dataset: Option<String>,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Copy datasets to their destinations
    Copy {
        /// Path to ferry.yaml
        #[arg(short, long, default_value = "ferry.yaml")]
        file: PathBuf,

        /// Target a specific dataset
        #[arg(short, long)]
        dataset: Option<String>,

        /// Re-copy files already recorded in the manifest
        #[arg(long)]
        force: bool,

        /// Plan and report without copying
        #[arg(long)]
        dry_run: bool,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Show copy state from manifests
    Status {
        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Target a specific dataset
        #[arg(short, long)]
        dataset: Option<String>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Plan {
            file,
            dataset,
            state_dir,
        } => cmd_plan(&file, &state_dir, dataset.as_deref()),
        Commands::Copy {
            file,
            dataset,
            force,
            dry_run,
            state_dir,
        } => cmd_copy(&file, &state_dir, dataset.as_deref(), force, dry_run),
        Commands::Status { state_dir, dataset } => cmd_status(&state_dir, dataset.as_deref()),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("ferry.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;

    let template = r#"version: "1.0"
name: my-copy-job
description: "Managed by ferry"

endpoints: {}

datasets: {}

policy:
  failure: stop_on_first
  verify: true
  journal: true
  manifest: true
"#;
    std::fs::write(&config_path, template)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized ferry project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);

    if errors.is_empty() {
        println!(
            "OK: {} ({} endpoints, {} datasets)",
            config.name,
            config.endpoints.len(),
            config.datasets.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Parse and validate a ferry config file, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<types::FerryConfig, String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

fn cmd_plan(file: &Path, state_dir: &Path, dataset_filter: Option<&str>) -> Result<(), String> {
    let config = parse_and_validate(file)?;

    // Planning lists remote sources, so sessions opened here get the
    // same lifecycle guarantee as a copy run.
    let closer = ResourceCloser::new();
    let result = plan_datasets(&config, state_dir, dataset_filter, &closer);
    if let Err(e) = closer.close_all() {
        warn!(error = %e, "session teardown failed after plan");
    }
    result
}

fn plan_datasets(
    config: &types::FerryConfig,
    state_dir: &Path,
    dataset_filter: Option<&str>,
    closer: &ResourceCloser,
) -> Result<(), String> {
    for (id, dataset) in &config.datasets {
        if let Some(filter) = dataset_filter {
            if id != filter {
                continue;
            }
        }

        let endpoint = config
            .endpoints
            .get(&dataset.from)
            .ok_or_else(|| format!("dataset '{}' references unknown endpoint '{}'", id, dataset.from))?;
        let src = source::connect(&dataset.from, endpoint, closer)?;
        let files = src.list()?;
        let existing = manifest::load_manifest(state_dir, id)?;
        let plan = planner::plan(id, dataset, &files, existing.as_ref())?;

        print_plan(&plan);
    }
    Ok(())
}

/// Display a plan to stdout.
fn print_plan(plan: &types::CopyPlan) {
    println!("Planning: {} ({} files)", plan.dataset, plan.changes.len());
    println!();

    for change in &plan.changes {
        let symbol = match change.action {
            types::PlanAction::Copy => "+",
            types::PlanAction::Refresh => "~",
            types::PlanAction::NoOp => " ",
        };
        println!("  {} {}", symbol, change.description);
    }

    println!();
    println!(
        "Plan: {} to copy, {} to refresh, {} unchanged.",
        plan.to_copy, plan.to_refresh, plan.unchanged
    );
}

fn cmd_copy(
    file: &Path,
    state_dir: &Path,
    dataset_filter: Option<&str>,
    force: bool,
    dry_run: bool,
) -> Result<(), String> {
    let config = parse_and_validate(file)?;

    let cfg = executor::JobConfig {
        config: &config,
        state_dir,
        force,
        dry_run,
        dataset_filter,
    };

    let results = executor::run(&cfg)?;

    if dry_run {
        println!("Dry run — nothing copied.");
        return Ok(());
    }

    let mut total_copied = 0;
    let mut total_unchanged = 0;
    let mut total_failed = 0;

    for result in &results {
        println!(
            "{}: {} copied, {} unchanged, {} failed ({:.1}s)",
            result.dataset,
            result.files_copied,
            result.files_unchanged,
            result.files_failed,
            result.total_duration.as_secs_f64()
        );
        total_copied += result.files_copied;
        total_unchanged += result.files_unchanged;
        total_failed += result.files_failed;
    }

    println!();
    if total_failed > 0 {
        println!(
            "Copy completed with errors: {} copied, {} unchanged, {} FAILED",
            total_copied, total_unchanged, total_failed
        );
        return Err(format!("{} file(s) failed", total_failed));
    }

    println!(
        "Copy complete: {} copied, {} unchanged.",
        total_copied, total_unchanged
    );
    Ok(())
}

fn cmd_status(state_dir: &Path, dataset_filter: Option<&str>) -> Result<(), String> {
    let entries = std::fs::read_dir(state_dir)
        .map_err(|e| format!("cannot read state dir {}: {}", state_dir.display(), e))?;

    let mut found = false;

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(filter) = dataset_filter {
            if name != filter {
                continue;
            }
        }

        if !entry.path().is_dir() {
            continue;
        }

        if let Some(man) = manifest::load_manifest(state_dir, &name)? {
            found = true;
            println!("Dataset: {}", man.dataset);
            println!("  Generated: {}", man.generated_at);
            println!("  Generator: {}", man.generator);
            println!("  Files: {}", man.files.len());

            for (rel_path, file) in &man.files {
                let duration = file
                    .duration_seconds
                    .map(|d| format!(" ({:.2}s)", d))
                    .unwrap_or_default();
                println!(
                    "    {}: {} [{} bytes]{}",
                    rel_path, file.status, file.size, duration
                );
            }
            println!();
        }
    }

    if !found {
        println!("No state found. Run `ferry copy` first.");
    }

    Ok(())
}
