use super::{Proxy, ProxyError, Request, Response};
use crate::config::{Definition, ExtraConfig, load_definitions};
use crate::expr::{Activation, ChainOutcome, Clock, CompileError, Compiler, EvaluatorChain, format_timestamp};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const LOG_TARGET: &str = "      gate";

/// Wraps a proxy with a pre chain evaluated against each request and a post chain
/// evaluated against each response.
///
/// The wrapped proxy is only called when every pre expression accepts, and its response
/// is only returned when every post expression accepts. Errors from the wrapped proxy are
/// returned unchanged.
#[derive(Debug)]
pub struct Gate {
    name: String,
    pre: EvaluatorChain,
    post: EvaluatorChain,
    next: Arc<dyn Proxy>,
    clock: Clock,
}

impl Gate {
    /// Build both chains from the same definitions.
    ///
    /// # Errors
    ///
    /// Returns the first hard compilation error of either chain
    pub fn new(name: impl Into<String>, definitions: &[Definition], next: Arc<dyn Proxy>) -> Result<Self, CompileError> {
        let name = name.into();
        let compiler = Compiler::for_checks();
        let pre = compiler.compile_pre(definitions)?;
        let post = compiler.compile_post(definitions)?;

        log::debug!(target: LOG_TARGET, "{name}: {} pre expression(s), {} post expression(s)", pre.len(), post.len());

        Ok(Self {
            name,
            pre,
            post,
            next,
            clock: Utc::now,
        })
    }

    /// Use a different source for `now`.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn pre_chain(&self) -> &EvaluatorChain {
        &self.pre
    }

    #[must_use]
    pub const fn post_chain(&self) -> &EvaluatorChain {
        &self.post
    }

    fn enforce(&self, chain: &EvaluatorChain, activation: &Activation) -> Result<(), ProxyError> {
        match chain.evaluate(activation) {
            ChainOutcome::Accepted { evaluated } => {
                log::debug!(target: LOG_TARGET, "{}-{}: {evaluated} expression(s) accepted", self.name, chain.phase());
                Ok(())
            }
            ChainOutcome::Rejected { index, expression, reason } => {
                log::info!(target: LOG_TARGET, "{}-{}: expression #{index} '{expression}' {reason}", self.name, chain.phase());
                Err(ProxyError::Aborted {
                    name: self.name.clone(),
                    phase: chain.phase(),
                    expression,
                    reason,
                })
            }
        }
    }
}

#[async_trait]
impl Proxy for Gate {
    async fn call(&self, request: Request) -> Result<Response, ProxyError> {
        let now = format_timestamp((self.clock)());

        self.enforce(&self.pre, &Activation::for_request(&request, &now))?;

        let response = match self.next.call(request).await {
            Ok(response) => response,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "{}: delegated execution failed: {e}", self.name);
                return Err(e);
            }
        };

        self.enforce(&self.post, &Activation::for_response(&response, &now))?;
        Ok(response)
    }
}

/// Decorate `next` with the policy stored in `extra`, if any.
///
/// Without a usable policy, or when the policy fails to compile, `next` is returned as is
/// so a broken policy never makes a route unreachable.
pub fn gate_proxy(name: &str, extra: &ExtraConfig, next: Arc<dyn Proxy>) -> Arc<dyn Proxy> {
    let Some(definitions) = load_definitions(extra) else {
        log::debug!(target: LOG_TARGET, "No policy detected for {name}");
        return next;
    };

    log::debug!(target: LOG_TARGET, "Loading the policy detected for {name}");

    match Gate::new(name, &definitions, Arc::clone(&next)) {
        Ok(gate) => Arc::new(gate),
        Err(e) => {
            log::warn!(target: LOG_TARGET, "Error parsing the definitions for {name}: {e}");
            log::warn!(target: LOG_TARGET, "Falling back to the undecorated proxy for {name}");
            next
        }
    }
}
