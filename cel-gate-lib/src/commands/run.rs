//! Command dispatch logic for cel-gate

use super::common::{LogLevel, init_logging};
use super::{CheckArgs, ClaimsArgs, InitArgs, ValidateArgs, check_claims, check_request, init_config, validate_config};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "cel-gate", version, author, long_about = None)]
#[command(about = "Validate and exercise CEL gateway policies")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: GateSubcommand,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum GateSubcommand {
    /// Generate an example gateway configuration file
    Init(InitArgs),
    /// Validate a gateway configuration file and summarize each route's policy
    Validate(ValidateArgs),
    /// Run a request through an endpoint's gate
    Check(Box<CheckArgs>),
    /// Run token claims through an endpoint's claims rejecter
    Claims(Box<ClaimsArgs>),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.log_level);

    match &cli.command {
        GateSubcommand::Init(init_args) => init_config(host, init_args),
        GateSubcommand::Validate(validate_args) => validate_config(host, validate_args),
        GateSubcommand::Check(check_args) => check_request(host, check_args).await,
        GateSubcommand::Claims(claims_args) => check_claims(host, claims_args),
    }
}
