//! Manifest validation
//!
//! Rules:
//! - parallelism >= 1
//! - job meta non-empty and unique
//! - job program non-empty
//! - shared_deadline_secs only together with shared_context

use std::collections::HashSet;

use contracts::{ContractError, FanoutManifest};

/// Validate a manifest
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(manifest: &FanoutManifest) -> Result<(), ContractError> {
    validate_settings(manifest)?;
    validate_jobs(manifest)?;
    Ok(())
}

/// Non-fatal findings, for reporting
pub fn warnings(manifest: &FanoutManifest) -> Vec<String> {
    let mut warnings = Vec::new();
    let settings = &manifest.fanout;

    if manifest.jobs.is_empty() {
        warnings.push("No jobs configured - the run will finish immediately".to_string());
    }

    if !settings.shared_context && settings.timeout_secs == 0 {
        warnings.push(
            "No shared context and timeout_secs = 0 - every job will be reported as invalid-context"
                .to_string(),
        );
    }

    if settings.shared_context && settings.shared_deadline_secs == 0 {
        warnings.push(
            "Shared context without a deadline - a hung job blocks the whole run".to_string(),
        );
    }

    if settings.shared_context && settings.timeout_secs > 0 {
        warnings.push("timeout_secs is ignored when shared_context = true".to_string());
    }

    if settings.parallelism > manifest.jobs.len() && !manifest.jobs.is_empty() {
        warnings.push(format!(
            "parallelism ({}) exceeds job count ({}) - surplus workers stay idle",
            settings.parallelism,
            manifest.jobs.len()
        ));
    }

    warnings
}

fn validate_settings(manifest: &FanoutManifest) -> Result<(), ContractError> {
    let settings = &manifest.fanout;

    if settings.parallelism == 0 {
        return Err(ContractError::config_validation(
            "fanout.parallelism",
            "parallelism must be >= 1",
        ));
    }

    if settings.shared_deadline_secs > 0 && !settings.shared_context {
        return Err(ContractError::config_validation(
            "fanout.shared_deadline_secs",
            "shared_deadline_secs requires shared_context = true",
        ));
    }

    Ok(())
}

fn validate_jobs(manifest: &FanoutManifest) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, job) in manifest.jobs.iter().enumerate() {
        if job.meta.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("jobs[{}].meta", idx),
                "job meta cannot be empty",
            ));
        }
        if !seen.insert(job.meta.as_str()) {
            return Err(ContractError::config_validation(
                format!("jobs[meta={}]", job.meta),
                "duplicate job meta",
            ));
        }
        if job.program.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("jobs[{}].program", job.meta),
                "program cannot be empty",
            ));
        }
    }
    Ok(())
}
