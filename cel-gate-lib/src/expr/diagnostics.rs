//! Sinks for compiler diagnostics

use core::fmt::Debug;

const LOG_TARGET: &str = "       cel";

/// Receives the diagnostics the compiler produces while checking expressions.
pub trait Diagnostics: Send + Sync + Debug {
    fn report(&self, message: &str);
}

/// Forwards diagnostics to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, message: &str) {
        log::debug!(target: LOG_TARGET, "{message}");
    }
}
