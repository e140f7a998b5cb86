//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{ExecutionContext, FanoutManifest};
use tracing::{info, warn};

use super::validate::describe_context;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading manifest");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut manifest = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load manifest from {}", args.config.display()))?;

    apply_overrides(&mut manifest, args);

    for warning in config_loader::warnings(&manifest) {
        warn!("{}", warning);
    }

    info!(
        jobs = manifest.jobs.len(),
        parallelism = manifest.fanout.parallelism,
        timeout_secs = manifest.fanout.timeout_secs,
        shared_context = manifest.fanout.shared_context,
        "Manifest loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - manifest is valid, exiting");
        print_manifest_summary(&manifest);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        settings: manifest.fanout.clone(),
        fail_fast: args.fail_fast,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    // Ctrl+C cancels the run; jobs still report before we return
    let shutdown = ExecutionContext::new();
    let signal = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_shutdown_signal().await;
            warn!("Received shutdown signal, cancelling jobs...");
            shutdown.cancel();
        }
    });

    info!("Starting fan-out...");
    let total = manifest.jobs.len();
    let report = pipeline
        .run(manifest.jobs, shutdown)
        .await
        .context("Fan-out execution failed");
    signal.abort();
    let report = report?;

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        duration_secs = report.duration.as_secs_f64(),
        "Fan-out finished"
    );
    report.print_summary();

    if report.failed() > 0 {
        if report.cancelled {
            return Err(CliError::Interrupted {
                completed: report.succeeded(),
                total,
            }
            .into());
        }
        return Err(CliError::JobsFailed {
            failed: report.failed(),
            total,
        }
        .into());
    }

    Ok(())
}

/// Apply command-line overrides on top of the manifest settings
fn apply_overrides(manifest: &mut FanoutManifest, args: &RunArgs) {
    let settings = &mut manifest.fanout;

    if let Some(parallelism) = args.parallelism {
        info!(parallelism, "Overriding parallelism from CLI");
        settings.parallelism = parallelism;
    }
    if let Some(timeout) = args.timeout {
        info!(timeout, "Overriding job timeout from CLI");
        settings.timeout_secs = timeout;
    }
    if args.shared {
        settings.shared_context = true;
    }
    if let Some(deadline) = args.shared_deadline {
        settings.shared_context = true;
        settings.shared_deadline_secs = deadline;
    }
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed that signal is ignored.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print manifest summary for dry-run mode
fn print_manifest_summary(manifest: &FanoutManifest) {
    let settings = &manifest.fanout;

    println!("\n=== Manifest Summary ===\n");
    println!("Fan-out:");
    println!("  Parallelism: {}", settings.parallelism);
    println!("  Context: {}", describe_context(settings));

    println!("\nJobs ({}):", manifest.jobs.len());
    for job in &manifest.jobs {
        println!("  - {}: {} {}", job.meta, job.program, job.args.join(" "));
    }

    println!();
}
