use super::Host;
use crate::Result;
use crate::config::{Definition, ExtraConfig, ServiceConfig, load_definitions};
use crate::expr::{CompileError, Compiler};
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the gateway configuration file
    #[arg(long, short = 'c', value_name = "PATH", default_value = "gateway.toml")]
    pub config: Utf8PathBuf,
}

fn count_expressions(definitions: &[Definition], with_claims: bool) -> Result<(usize, usize, usize), CompileError> {
    let compiler = Compiler::for_checks();
    let pre = compiler.compile_pre(definitions)?.len();
    let post = compiler.compile_post(definitions)?.len();
    let claims = if with_claims { compiler.compile_claims(definitions)?.len() } else { 0 };
    Ok((pre, post, claims))
}

/// Describe the policy a route ends up with once its definitions are compiled.
fn describe_policy(extra: &ExtraConfig, with_claims: bool) -> String {
    let Some(definitions) = load_definitions(extra) else {
        return "no policy".to_string();
    };

    match count_expressions(&definitions, with_claims) {
        Ok((pre, post, claims)) if with_claims => format!("{pre} pre, {post} post, {claims} claims"),
        Ok((pre, post, _)) => format!("{pre} pre, {post} post"),
        Err(e) => format!("falls back to pass-through ({e})"),
    }
}

/// Loads a gateway configuration and reports the policy each route ends up with
pub fn validate_config<H: Host>(host: &mut H, args: &ValidateArgs) -> Result<()> {
    match ServiceConfig::load(&args.config) {
        Ok(config) => {
            let _ = writeln!(host.output(), "Configuration file is valid: {}", args.config);
            for endpoint in &config.endpoints {
                let _ = writeln!(
                    host.output(),
                    "endpoint {}: {}",
                    endpoint.endpoint,
                    describe_policy(&endpoint.extra_config, true)
                );

                for backend in &endpoint.backends {
                    let _ = writeln!(
                        host.output(),
                        "  backend {}: {}",
                        backend.url_pattern,
                        describe_policy(&backend.extra_config, false)
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            let _ = writeln!(host.error(), "❌ Configuration validation failed: {e}");
            host.exit(1);
            Err(e)
        }
    }
}
