//! External tool invocation shared by the ffmpeg and ffprobe adapters

use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Failure of a single external tool invocation
#[derive(Error, Debug)]
pub enum ToolError {
    /// The program could not be started or waited on
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran past the configured ceiling and was killed
    #[error("{program} timed out after {}s", timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    /// The program exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Run `command` to completion, capturing its output
///
/// The child is killed when the returned future is dropped, which covers
/// both the timeout and cancellation of the surrounding task.
pub async fn run_tool(mut command: Command, timeout: Duration) -> Result<Output, ToolError> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();
    debug!(program = %program, args = ?command.as_std().get_args().collect::<Vec<_>>(), "spawning");

    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Err(_) => return Err(ToolError::TimedOut { program, timeout }),
        Ok(result) => result.map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?,
    };

    if !output.status.success() {
        return Err(ToolError::Failed {
            program,
            status: output.status.to_string(),
            stderr: last_lines(&String::from_utf8_lossy(&output.stderr), 8),
        });
    }

    Ok(output)
}

/// Keep the tail of a diagnostic stream, which is where ffmpeg reports the cause
fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
