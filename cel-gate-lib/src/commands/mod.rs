//! Command-line interface for cel-gate
//!
//! The commands let operators work with a gateway configuration file without running
//! a gateway:
//!
//! - **init**: Generate an example configuration with a few policies
//! - **validate**: Load a configuration and summarize the chains each route compiles to
//! - **check**: Run a JSON request (and optionally a JSON backend response) through an
//!   endpoint's gates
//! - **claims**: Run a JSON claims object through an endpoint's claims rejecter
//!
//! All output goes through a [`Host`] so the commands can be run in-process by tests.

mod check;
mod claims;
mod common;
mod host;
mod init;
mod run;
mod validate;

pub use check::{CheckArgs, check_request};
pub use claims::{ClaimsArgs, check_claims};
pub use common::{EndpointArgs, LogLevel};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use run::run;
pub use validate::{ValidateArgs, validate_config};
