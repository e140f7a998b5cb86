//! `info` command implementation.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use contracts::FanoutManifest;
use serde::Serialize;
use tracing::info;

use super::validate::describe_context;
use crate::cli::InfoArgs;

/// Manifest info for JSON output
#[derive(Serialize)]
struct ManifestInfo {
    version: String,
    fanout: FanoutInfo,
    job_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    jobs: Vec<JobInfo>,
}

#[derive(Serialize)]
struct FanoutInfo {
    parallelism: usize,
    context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shared_deadline_secs: Option<u64>,
}

#[derive(Serialize)]
struct JobInfo {
    meta: String,
    program: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cwd: Option<PathBuf>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    env: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading manifest info");

    if !args.config.exists() {
        anyhow::bail!("Manifest not found: {}", args.config.display());
    }

    let manifest = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load manifest from {}", args.config.display()))?;

    if args.json {
        let info = build_manifest_info(&manifest, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize manifest info")?;
        println!("{}", json);
    } else {
        print_manifest_info(&manifest, args);
    }

    Ok(())
}

fn build_manifest_info(manifest: &FanoutManifest, args: &InfoArgs) -> ManifestInfo {
    let settings = &manifest.fanout;

    let jobs = if args.jobs {
        manifest
            .jobs
            .iter()
            .map(|j| JobInfo {
                meta: j.meta.clone(),
                program: j.program.clone(),
                args: j.args.clone(),
                cwd: j.cwd.clone(),
                env: j.env.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ManifestInfo {
        version: format!("{:?}", manifest.version),
        fanout: FanoutInfo {
            parallelism: settings.parallelism,
            context: describe_context(settings),
            timeout_secs: (settings.timeout_secs > 0).then_some(settings.timeout_secs),
            shared_deadline_secs: settings.shared_deadline().map(|d| d.as_secs()),
        },
        job_count: manifest.jobs.len(),
        jobs,
    }
}

fn print_manifest_info(manifest: &FanoutManifest, args: &InfoArgs) {
    let settings = &manifest.fanout;

    println!("=== Fanout Manifest ===\n");

    println!("Fan-out");
    println!("   ├─ Version: {:?}", manifest.version);
    println!("   ├─ Parallelism: {}", settings.parallelism);
    println!("   └─ Context: {}", describe_context(settings));

    println!("\nJobs ({})", manifest.jobs.len());
    if !args.jobs {
        println!("   └─ (use --jobs to list)");
    } else {
        for (i, job) in manifest.jobs.iter().enumerate() {
            let is_last = i == manifest.jobs.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let child_prefix = if is_last { "   " } else { "│  " };

            println!("   {} {}", prefix, job.meta);
            println!(
                "   {}  command: {} {}",
                child_prefix,
                job.program,
                job.args.join(" ")
            );
            if let Some(ref cwd) = job.cwd {
                println!("   {}  cwd: {}", child_prefix, cwd.display());
            }
            if !job.env.is_empty() {
                let mut keys: Vec<_> = job.env.keys().map(String::as_str).collect();
                keys.sort_unstable();
                println!("   {}  env: {}", child_prefix, keys.join(", "));
            }
        }
    }

    println!();
}
