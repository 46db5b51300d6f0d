#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for cel-gate
//!
//! This library implements a CEL (Common Expression Language) gate for API gateway
//! pipelines. Operators attach short boolean expressions to a route's configuration,
//! and the gate evaluates them against request data, response data, or authentication
//! claims, aborting the call whenever an expression does not evaluate to `true`.
//!
//! # Module Organization
//!
//! - [`config`]: Expression definitions and gateway service configuration
//! - [`expr`]: Expression compilation, activations, and evaluator chains
//! - [`proxy`]: The proxy abstraction and the gate that decorates it
//! - [`rejecter`]: Claims-based rejection for the authentication layer
//! - [`commands`]: Command-line interface used by the `cel-gate` binary

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod commands;
pub mod config;
pub mod expr;
pub mod proxy;
pub mod rejecter;

pub use crate::commands::{Host, run};
pub use crate::config::{Definition, ExtraConfig, NAMESPACE, load_definitions};
pub use crate::proxy::{Proxy, ProxyError, Request, Response};
pub use crate::rejecter::{ClaimsRejecter, reject_claims};
