//! Sinks for the optimizer's before/after diagnostic lines.

use log::{Level, info, log_enabled};

/// Receives human-readable diagnostic lines.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, line: &str);

    /// Whether reported lines go anywhere. Callers skip rendering when not.
    fn enabled(&self) -> bool {
        true
    }
}

/// Discards every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn report(&self, _line: &str) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Forwards lines to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, line: &str) {
        info!("{line}");
    }

    fn enabled(&self) -> bool {
        log_enabled!(Level::Info)
    }
}
