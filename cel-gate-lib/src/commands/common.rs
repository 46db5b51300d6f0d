//! Helpers shared by the subcommands

use crate::Result;
use crate::config::{EndpointConfig, ServiceConfig};
use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use ohno::{IntoAppError, app_err};
use serde::de::DeserializeOwned;
use std::fs;

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // a logger may already be installed when commands run in-process more than once
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

/// The gateway configuration file and the endpoint a command operates on
#[derive(clap::Args, Debug, Clone)]
pub struct EndpointArgs {
    /// Path to the gateway configuration file
    #[arg(long, short = 'c', value_name = "PATH", default_value = "gateway.toml")]
    pub config: Utf8PathBuf,

    /// Endpoint path as written in the configuration, e.g. `/users/{id}`
    #[arg(long, value_name = "ENDPOINT")]
    pub endpoint: String,
}

impl EndpointArgs {
    /// Load the configuration and find the selected endpoint in it
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or does not define the endpoint
    pub fn load(&self) -> Result<EndpointConfig> {
        let config = ServiceConfig::load(&self.config)?;
        config
            .endpoint(&self.endpoint)
            .cloned()
            .ok_or_else(|| app_err!("endpoint '{}' is not defined in '{}'", self.endpoint, self.config))
    }
}

/// Read and parse a JSON input file
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold a valid `T`
pub fn read_json<T: DeserializeOwned>(path: &Utf8Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path).into_app_err_with(|| format!("reading {what} file '{path}'"))?;
    serde_json::from_str(&text).into_app_err_with(|| format!("parsing {what} file '{path}'"))
}
