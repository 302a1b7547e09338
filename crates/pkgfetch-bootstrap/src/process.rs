//! Subprocess execution with line-by-line output pumping
//!
//! Both stdout and stderr are read concurrently and handed to a callback as
//! they arrive. The child is killed when the cancellation token fires, when
//! the optional timeout elapses, or when the returned future is dropped.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Which stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Errors raised while running a subprocess
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} was cancelled")]
    Cancelled { program: String },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

impl ProcessError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Run `program` with `args`, forwarding every output line to `on_line`
///
/// Returns the exit code; `None` means the process was terminated by a signal.
pub async fn run_process<F>(
    program: &Path,
    args: &[String],
    timeout: Option<Duration>,
    cancel: &CancellationToken,
    mut on_line: F,
) -> Result<Option<i32>, ProcessError>
where
    F: FnMut(OutputStream, &str),
{
    let program_name = program.display().to_string();
    debug!(program = %program_name, args = ?args, "Starting process");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program_name.clone(),
        source,
    })?;

    let pumped = pump(&mut child, &program_name, cancel, &mut on_line);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, pumped).await {
            Ok(result) => result,
            Err(_) => Err(ProcessError::Timeout {
                program: program_name.clone(),
                timeout: limit,
            }),
        },
        None => pumped.await,
    };

    match result {
        Ok(status) => {
            debug!(program = %program_name, exit_code = ?status.code(), "Process exited");
            Ok(status.code())
        }
        Err(err) => {
            if let Err(kill_err) = child.kill().await {
                debug!(program = %program_name, error = %kill_err, "Failed to kill process");
            }
            Err(err)
        }
    }
}

async fn pump<F>(
    child: &mut Child,
    program: &str,
    cancel: &CancellationToken,
    on_line: &mut F,
) -> Result<ExitStatus, ProcessError>
where
    F: FnMut(OutputStream, &str),
{
    let io_err = |source| ProcessError::Io {
        program: program.to_string(),
        source,
    };
    let cancelled = || ProcessError::Cancelled {
        program: program.to_string(),
    };

    let mut stdout = child.stdout.take().map(|out| BufReader::new(out).lines());
    let mut stderr = child.stderr.take().map(|err| BufReader::new(err).lines());

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            line = next_line(&mut stdout), if stdout.is_some() => match line.map_err(io_err)? {
                Some(line) => on_line(OutputStream::Stdout, &line),
                None => stdout = None,
            },
            line = next_line(&mut stderr), if stderr.is_some() => match line.map_err(io_err)? {
                Some(line) => on_line(OutputStream::Stderr, &line),
                None => stderr = None,
            },
        }
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled()),
        status = child.wait() => status.map_err(io_err),
    }
}

async fn next_line<R>(
    lines: &mut Option<tokio::io::Lines<BufReader<R>>>,
) -> std::io::Result<Option<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await,
        None => Ok(None),
    }
}
