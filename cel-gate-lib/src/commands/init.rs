use super::Host;
use crate::Result;
use crate::config::ServiceConfig;
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output configuration file path
    #[arg(value_name = "PATH", default_value = "gateway.toml")]
    pub output: Utf8PathBuf,
}

pub fn init_config<H: Host>(host: &mut H, args: &InitArgs) -> Result<()> {
    ServiceConfig::save_example(&args.output)?;
    let _ = writeln!(host.output(), "Generated example gateway configuration file: {}", args.output);
    Ok(())
}
