//! Functions the gate adds on top of the CEL built-ins

use cel_interpreter::{Context, ExecutionError, ResolveResult, Value};
use chrono::{DateTime, Datelike};
use std::sync::Arc;

pub const WEEKDAY: &str = "weekday";

/// Register the gate's extension functions in an evaluation context.
pub fn register(context: &mut Context<'_>) {
    context.add_function(WEEKDAY, weekday);
}

/// `weekday(string) -> int`: day of the week of an RFC 3339 timestamp, Sunday is 0.
fn weekday(timestamp: Arc<String>) -> ResolveResult {
    DateTime::parse_from_rfc3339(&timestamp)
        .map(|ts| Value::Int(i64::from(ts.weekday().num_days_from_sunday())))
        .map_err(|e| ExecutionError::function_error(WEEKDAY, e.to_string()))
}
