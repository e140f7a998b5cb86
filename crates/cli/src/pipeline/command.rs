//! Runs one manifest job as a child process.

use std::process::Stdio;

use contracts::{CommandJob, ExecutionContext};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CommandError;

/// Run `job` to completion, killing it once `ctx` or `shutdown` is done.
///
/// A job whose context is already done is not started at all.
pub async fn run_command(
    ctx: ExecutionContext,
    shutdown: ExecutionContext,
    job: CommandJob,
) -> Result<(), CommandError> {
    if let Some(reason) = shutdown.err().or_else(|| ctx.err()) {
        return Err(CommandError::Interrupted(reason));
    }

    let mut command = Command::new(&job.program);
    command
        .args(&job.args)
        .envs(&job.env)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(cwd) = &job.cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|source| CommandError::Spawn {
        program: job.program.clone(),
        source,
    })?;
    debug!(job = %job.meta, pid = ?child.id(), "Process started");

    let reason = tokio::select! {
        status = child.wait() => {
            let status = status.map_err(CommandError::Wait)?;
            debug!(job = %job.meta, %status, "Process exited");
            return if status.success() {
                Ok(())
            } else {
                Err(CommandError::Exit { code: status.code() })
            };
        }
        reason = ctx.done() => reason,
        reason = shutdown.done() => reason,
    };

    warn!(job = %job.meta, %reason, "Killing process");
    if let Err(e) = child.kill().await {
        warn!(job = %job.meta, error = %e, "Failed to kill process");
    }
    Err(CommandError::Interrupted(reason))
}
