//! Piped subprocess calls with a watchdog timeout

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Captured output of a finished process
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Trimmed stdout of a successful run, or a derivation error naming `stage`
    pub fn into_stdout(self, stage: &str) -> Result<String> {
        if !self.status.success() {
            return Err(Error::derivation(
                stage,
                format!("{}: {}", self.status, self.stderr.trim()),
            ));
        }
        let out = self.stdout.trim().to_string();
        if out.is_empty() {
            return Err(Error::derivation(stage, "tool produced no output"));
        }
        Ok(out)
    }
}

/// Run `program args..`, feed `input` on stdin and wait at most `timeout`.
///
/// The stdin write, the wait and the collection of stdout and stderr all
/// share one deadline. When it expires the child is dropped, which kills
/// it, and output still held open by its descendants is abandoned.
pub(crate) fn run_piped(
    program: &Path,
    args: &[&str],
    input: Option<&str>,
    timeout: Duration,
) -> Result<ProcessOutput> {
    let stage = describe(program, args);
    debug!(command = %stage, "running toolchain command");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::derivation(&stage, format!("failed to start process runtime: {e}")))?;

    runtime.block_on(run_with_deadline(program, args, input, timeout, &stage))
}

async fn run_with_deadline(
    program: &Path,
    args: &[&str],
    input: Option<&str>,
    timeout: Duration,
    stage: &str,
) -> Result<ProcessOutput> {
    let mut child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::ToolchainUnavailable {
            tool: program.display().to_string(),
            reason: format!("failed to start: {e}"),
        })?;

    let run = async move {
        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| Error::derivation(stage, format!("failed to write stdin: {e}")))?;
            // Dropping stdin closes the pipe so the tool sees EOF.
        }
        child
            .wait_with_output()
            .await
            .map_err(|e| Error::derivation(stage, format!("failed to wait for process: {e}")))
    };

    let output = tokio::time::timeout(timeout, run)
        .await
        .map_err(|_| Error::derivation(stage, format!("timed out after {}s", timeout.as_secs_f32())))??;

    Ok(ProcessOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn describe(program: &Path, args: &[&str]) -> String {
    let name = program
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string());
    // Only the leading subcommand words; later arguments may be file paths.
    let sub: Vec<&str> = args.iter().take(2).copied().collect();
    format!("{name} {}", sub.join(" "))
}
