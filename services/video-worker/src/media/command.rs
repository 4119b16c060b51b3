use crate::error::{PipelineError, PipelineResult};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

/// Lines of stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 12;

/// Run `program` with `args`, killing it if it outlives `timeout`.
///
/// A timeout always becomes `PipelineError::Timeout`; spawn failures and
/// non-zero exits are turned into a stage error by `stage_error`.
pub async fn run_tool<F>(
    program: &str,
    args: &[String],
    timeout: Duration,
    stage_error: F,
) -> PipelineResult<Output>
where
    F: Fn(String) -> PipelineError,
{
    debug!("Running {} {}", program, args.join(" "));

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(stage_error(format!("could not start {}: {}", program, e))),
        Err(_) => {
            error!("{} timed out after {} seconds", program, timeout.as_secs());
            return Err(PipelineError::Timeout {
                tool: program.to_string(),
                seconds: timeout.as_secs(),
            });
        }
    };

    if !output.status.success() {
        error!("{} failed with status: {:?}", program, output.status);
        return Err(stage_error(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr_tail(&output.stderr)
        )));
    }

    Ok(output)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
