//! packset - Main entry point
//!
//! Thin command line wrapper around the library: parse arguments, set up
//! logging, dispatch to a command and turn the outcome into an exit code.

use anyhow::{Context, Result};
use packset::cli::{Cli, Commands};
use packset::{
    apply_to_pack, effective_values, inspect, open_pack, validate, ChosenValues, FeatureConfig,
    PacksetDescriptor, SavedConfig,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Initialize tracing. RUST_LOG wins over the verbosity flag.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);
    debug!("packset {} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Validate { pack } => run_validate(&pack),
        Commands::Show { pack } => run_show(&pack),
        Commands::Apply {
            pack,
            set,
            values,
            dry_run,
        } => run_apply(&pack, &set, values, dry_run),
        Commands::Status { pack } => run_status(&pack),
    }
}

/// Open the pack read-only and load its root descriptor
fn load_pack(pack: &Path) -> Result<(Box<dyn packset::Storage>, PacksetDescriptor)> {
    let backend =
        open_pack(pack, true).with_context(|| format!("Failed to open pack {:?}", pack))?;
    let descriptor = PacksetDescriptor::load(backend.as_ref())
        .with_context(|| format!("Failed to load descriptor of {:?}", pack))?;
    Ok((backend, descriptor))
}

fn run_validate(pack: &Path) -> Result<ExitCode> {
    let (backend, descriptor) = load_pack(pack)?;
    let issues = validate(&descriptor, backend.as_ref());
    backend.close()?;

    if issues.is_empty() {
        println!(
            "✓ {:?} is valid ({} feature(s))",
            pack,
            descriptor.features.len()
        );
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!("✗ {:?} has {} problem(s):", pack, issues.len());
    for issue in &issues {
        eprintln!("  - {}", issue);
    }
    Ok(ExitCode::FAILURE)
}

fn run_show(pack: &Path) -> Result<ExitCode> {
    let (backend, descriptor) = load_pack(pack)?;
    let saved = SavedConfig::load(backend.as_ref())?;
    backend.close()?;
    let values = effective_values(&descriptor, &saved);

    for group in descriptor.display_groups() {
        let title = if group.title.is_empty() {
            "Other"
        } else {
            group.title.as_str()
        };
        match &group.id {
            Some(id) if id != title => println!("[{}] {}", id, title),
            _ => println!("{}", title),
        }
        if !group.description.is_empty() {
            println!("  {}", group.description);
        }
        for name in &group.features {
            let Some(feature) = descriptor.feature(name) else {
                continue;
            };
            let line = match feature.config() {
                Ok(FeatureConfig::Bool(cfg)) => format!("default={}", cfg.default),
                Ok(FeatureConfig::Toggle(cfg)) => {
                    format!("default={} scope=[{}]", cfg.default, cfg.scope.join(", "))
                }
                Err(e) => format!("invalid: {}", e),
            };
            let value = values
                .get(name)
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string());
            println!("  {} ({}) {} value={}", name, feature.kind, line, value);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_apply(
    pack: &Path,
    set: &[String],
    values: Option<PathBuf>,
    dry_run: bool,
) -> Result<ExitCode> {
    let mut chosen = match values {
        Some(path) => ChosenValues::load_from_file(&path)?,
        None => ChosenValues::new(),
    };
    chosen.extend(ChosenValues::from_assignments(set)?);
    if chosen.is_empty() {
        anyhow::bail!("Nothing to apply: pass --set NAME=VALUE or --values FILE");
    }

    info!(
        "Applying {} value(s) to {:?}{}",
        chosen.len(),
        pack,
        if dry_run { " (dry run)" } else { "" }
    );
    let report = apply_to_pack(pack, &chosen, dry_run)
        .with_context(|| format!("Failed to apply values to {:?}", pack))?;

    println!("{}", report.summary());
    if report.has_failures() {
        eprintln!("✗ Some features could not be applied");
        return Ok(ExitCode::FAILURE);
    }
    if dry_run {
        println!("✓ Dry run complete, pack unchanged");
    } else {
        println!("✓ Pack updated");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_status(pack: &Path) -> Result<ExitCode> {
    let (backend, descriptor) = load_pack(pack)?;
    let statuses = inspect(&descriptor, backend.as_ref())?;
    backend.close()?;

    for status in &statuses {
        println!("{}", status);
    }
    let inconsistent = statuses.iter().filter(|s| !s.is_consistent()).count();
    if inconsistent > 0 {
        eprintln!("✗ {} feature(s) do not match the saved configuration", inconsistent);
        return Ok(ExitCode::FAILURE);
    }
    println!("✓ All {} feature(s) consistent", statuses.len());
    Ok(ExitCode::SUCCESS)
}
