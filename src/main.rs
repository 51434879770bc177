//! Windows Turbo Optimizer - Main entry point
//!
//! Parses the command line, detects the host environment, builds the task
//! catalog and drives one run of the engine, printing progress as each task
//! finishes.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use turbo_optimizer::cli::{Cli, Commands, RunArgs};
use turbo_optimizer::config::OptimizerConfig;
use turbo_optimizer::engine::{CancelToken, Engine};
use turbo_optimizer::process_guard::{self, ProcessGuard};
use turbo_optimizer::report::Report;
use turbo_optimizer::run_state::Progress;
use turbo_optimizer::system::SystemContext;
use turbo_optimizer::tasks::default_registry;
use turbo_optimizer::{OptimizerError, TaskDescriptor, TaskRegistry};

/// Initialize tracing on stderr so stdout stays clean for reports
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main application entry point
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    info!("Windows Turbo Optimizer starting up");

    // Terminates any tracked child still running when main returns
    let _guard = ProcessGuard::new();

    match &cli.command {
        Some(Commands::List) => list_tasks(&cli),
        Some(Commands::Validate { config }) => validate_config(&cli, config),
        Some(Commands::InitConfig { path }) => init_config(&cli, path),
        Some(Commands::Run(args)) => run_tasks(&cli, args),
        None => {
            debug!("No command specified, running catalog defaults");
            run_tasks(&cli, &RunArgs::default())
        }
    }
}

fn build_registry(dry_run: bool) -> Result<(SystemContext, TaskRegistry)> {
    let ctx = SystemContext::detect(dry_run);
    let registry = default_registry(&ctx).context("Failed to build task catalog")?;
    Ok((ctx, registry))
}

#[derive(Serialize)]
struct CatalogEntry<'a> {
    index: usize,
    #[serde(flatten)]
    descriptor: &'a TaskDescriptor,
}

fn list_tasks(cli: &Cli) -> Result<()> {
    let (_, registry) = build_registry(cli.dry_run)?;

    if cli.json {
        let entries: Vec<CatalogEntry<'_>> = registry
            .list()
            .enumerate()
            .map(|(index, descriptor)| CatalogEntry { index, descriptor })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (i, task) in registry.list().enumerate() {
        let mark = if task.enabled_by_default { "[x]" } else { "[ ]" };
        let mut flags = Vec::new();
        if task.critical {
            flags.push("crítica");
        }
        if task.parallel_affinity {
            flags.push("paralela");
        }
        println!("{} {} {:<28} {}", mark, i, task.name, task.description);
        if !flags.is_empty() {
            println!("        ({})", flags.join(", "));
        }
    }
    Ok(())
}

fn validate_config(cli: &Cli, path: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", path);
    let (_, registry) = build_registry(cli.dry_run)?;

    let result = OptimizerConfig::load_from_file(path).and_then(|config| {
        config.validate(&registry)?;
        Ok(config)
    });
    match result {
        Ok(config) => {
            info!("Configuration validation successful");
            println!("✓ Configuration file is valid: {:?}", config);
            Ok(())
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("✗ Configuration validation failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_config(cli: &Cli, path: &Path) -> Result<()> {
    if path.exists() {
        return Err(OptimizerError::general(format!(
            "{} already exists; refusing to overwrite",
            path.display()
        ))
        .into());
    }
    let (_, registry) = build_registry(cli.dry_run)?;
    let defaults = registry
        .default_selection()
        .into_iter()
        .filter_map(|i| registry.descriptor(i).map(|d| d.name.clone()))
        .collect();

    let config = OptimizerConfig {
        tasks: Some(defaults),
        dry_run: cli.dry_run,
        ..OptimizerConfig::default()
    };
    config.save_to_file(path)?;
    info!("Wrote default configuration to {:?}", path);
    println!("✓ Configuration written to {}", path.display());
    Ok(())
}

fn run_tasks(cli: &Cli, args: &RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration: {:?}", path);
            OptimizerConfig::load_from_file(path)?
        }
        None => OptimizerConfig::default(),
    };
    config.dry_run |= cli.dry_run;
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    if let Some(max_workers) = args.max_workers {
        config.max_workers = max_workers;
    }

    let (ctx, registry) = build_registry(config.dry_run)?;
    config.validate(&registry)?;

    if !ctx.is_elevated() {
        warn!("Not running as administrator; privileged tasks will report access denied");
        eprintln!("⚠️  Algunas tareas requieren permisos de administrador para ejecutarse correctamente.");
    }
    if config.dry_run {
        info!("Dry-run mode: no changes will be made");
    }

    let indices = if args.all {
        (0..registry.len()).collect()
    } else if let Some(tasks) = &args.tasks {
        tasks.clone()
    } else {
        config.resolve_selection(&registry)?
    };

    let engine = Engine::new(Arc::new(registry), config.engine_options());
    let cancel = CancelToken::new();
    if let Err(e) = process_guard::init_interrupt_handler(cancel.clone()) {
        warn!("Failed to install interrupt handler: {}", e);
    }

    let handle = engine.request_run_with_cancel(&indices, cancel)?;
    for progress in handle.progress() {
        if !cli.json {
            print_progress(&progress);
        }
    }
    let report = handle.wait()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_progress(progress: &Progress) {
    let icon = if progress.outcome.is_success() { "✅" } else { "❌" };
    println!(
        "[{}/{}] {:>3}% {} {}: {}",
        progress.completed,
        progress.total,
        progress.percent(),
        icon,
        progress.task,
        progress.outcome
    );
}

fn print_summary(report: &Report) {
    println!();
    if report.cancelled {
        println!("⚠️  Ejecución cancelada.");
    }
    if report.is_clean() {
        println!("Éxito total: {} tareas.", report.len());
    } else {
        println!("{} OK, {} Advertencias.", report.succeeded(), report.failed());
    }
    println!("Tiempo: {:.1}s", report.elapsed_ms as f64 / 1000.0);
}
