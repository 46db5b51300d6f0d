use super::Host;
use super::common::{EndpointArgs, read_json};
use crate::Result;
use crate::rejecter::{ClaimsRejecter, reject_claims};
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ClaimsArgs {
    #[command(flatten)]
    pub target: EndpointArgs,

    /// JSON file holding the verified token claims
    #[arg(long, value_name = "PATH")]
    pub claims: Utf8PathBuf,
}

/// Runs a set of claims through an endpoint's claims rejecter
pub fn check_claims<H: Host>(host: &mut H, args: &ClaimsArgs) -> Result<()> {
    let endpoint = args.target.load()?;
    let claims: serde_json::Map<String, serde_json::Value> = read_json(&args.claims, "claims")?;

    let rejecter = ClaimsRejecter::new(&endpoint.endpoint, &endpoint.extra_config);
    if rejecter.is_none() {
        let _ = writeln!(host.error(), "No claims policy for endpoint {}", endpoint.endpoint);
    }

    if reject_claims(rejecter.as_ref(), &claims) {
        let _ = writeln!(host.output(), "rejected");
        host.exit(1);
    } else {
        let _ = writeln!(host.output(), "accepted");
    }

    Ok(())
}
