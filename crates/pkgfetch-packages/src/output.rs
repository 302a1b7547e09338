//! Bounded logging of subprocess output

use pkgfetch_bootstrap::OutputStream;
use tracing::{debug, info, trace, warn};

/// Number of output lines logged at the configured level
pub const LOGGED_LINE_LIMIT: usize = 500;

/// Level used for the first [`LOGGED_LINE_LIMIT`] stdout lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Info,
    Trace,
}

/// Logs the first lines of a process's output and counts the rest
#[derive(Debug)]
pub struct OutputLog {
    program: String,
    level: LineLevel,
    limit: usize,
    seen: usize,
}

impl OutputLog {
    pub fn new(program: impl Into<String>, level: LineLevel) -> Self {
        Self {
            program: program.into(),
            level,
            limit: LOGGED_LINE_LIMIT,
            seen: 0,
        }
    }

    pub fn line(&mut self, stream: OutputStream, line: &str) {
        self.seen += 1;

        if self.seen > self.limit {
            trace!(program = %self.program, stream = ?stream, "{}", line);
            return;
        }

        match (stream, self.level) {
            (OutputStream::Stderr, _) => warn!(program = %self.program, "{}", line),
            (OutputStream::Stdout, LineLevel::Info) => info!(program = %self.program, "{}", line),
            (OutputStream::Stdout, LineLevel::Trace) => trace!(program = %self.program, "{}", line),
        }
    }

    /// Number of lines seen so far
    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn finish(&self) {
        if self.seen > self.limit {
            debug!(
                program = %self.program,
                total = self.seen,
                suppressed = self.seen - self.limit,
                "Output exceeded the logging limit"
            );
        }
    }
}
