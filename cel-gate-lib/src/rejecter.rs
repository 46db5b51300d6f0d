//! Claims-based rejection for the authentication layer
//!
//! After a token's signature has been verified, its claims can be run through the
//! `JWT` expressions of the endpoint's policy. The token is rejected unless every
//! expression evaluates to `true`.

use crate::config::{ExtraConfig, load_definitions};
use crate::expr::{Activation, ChainOutcome, Clock, Compiler, EvaluatorChain, format_timestamp};
use chrono::Utc;

const LOG_TARGET: &str = "  rejecter";

/// Decides whether a set of verified claims must be rejected.
#[derive(Debug, Clone)]
pub struct ClaimsRejecter {
    name: String,
    chain: EvaluatorChain,
    clock: Clock,
}

impl ClaimsRejecter {
    /// Build the rejecter for an endpoint.
    ///
    /// Returns `None` when the endpoint has no usable policy, or when its claims
    /// expressions fail to compile. Callers treat `None` as accepting every token.
    #[must_use]
    pub fn new(name: &str, extra: &ExtraConfig) -> Option<Self> {
        let name = format!("[ENDPOINT: {name}][CEL]");
        let definitions = load_definitions(extra)?;

        match Compiler::for_checks().compile_claims(&definitions) {
            Ok(chain) => Some(Self {
                name,
                chain,
                clock: Utc::now,
            }),
            Err(e) => {
                log::debug!(target: LOG_TARGET, "{name} Error building the JWT rejecter: {e}");
                None
            }
        }
    }

    /// Use a different source for `now`.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn chain(&self) -> &EvaluatorChain {
        &self.chain
    }

    /// Whether `claims` must be rejected.
    #[must_use]
    pub fn reject(&self, claims: &serde_json::Map<String, serde_json::Value>) -> bool {
        let now = format_timestamp((self.clock)());

        match self.chain.evaluate(&Activation::for_claims(claims, &now)) {
            ChainOutcome::Accepted { evaluated } => {
                log::debug!(target: LOG_TARGET, "{} {evaluated} expression(s) accepted the claims", self.name);
                false
            }
            ChainOutcome::Rejected { index, expression, reason } => {
                log::info!(target: LOG_TARGET, "{} Rejecter #{index} '{expression}' {reason}", self.name);
                true
            }
        }
    }
}

/// Apply an optional rejecter; without one nothing is rejected.
#[must_use]
pub fn reject_claims(rejecter: Option<&ClaimsRejecter>, claims: &serde_json::Map<String, serde_json::Value>) -> bool {
    rejecter.is_some_and(|r| r.reject(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NAMESPACE;
    use serde_json::json;

    fn extra(value: serde_json::Value) -> ExtraConfig {
        let mut extra = ExtraConfig::new();
        let _ = extra.insert(NAMESPACE.to_string(), value);
        extra
    }

    fn claims(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_no_policy_is_none() {
        assert!(ClaimsRejecter::new("/a", &ExtraConfig::new()).is_none());
        assert!(ClaimsRejecter::new("/a", &extra(json!({"check_expr": "has(JWT.sub)"}))).is_none());
    }

    #[test]
    fn test_parse_failure_is_none() {
        assert!(ClaimsRejecter::new("/a", &extra(json!([{"check_expr": "has(JWT.sub) &&"}]))).is_none());
    }

    #[test]
    fn test_policy_without_claims_expressions_accepts_everything() {
        let rejecter = ClaimsRejecter::new("/a", &extra(json!([{"check_expr": "req_method == 'GET'"}]))).unwrap();
        assert!(rejecter.chain().is_empty());
        assert!(!rejecter.reject(&claims(json!({}))));
    }

    #[test]
    fn test_rejects_unless_all_true() {
        let rejecter = ClaimsRejecter::new(
            "/a",
            &extra(json!([
                {"check_expr": "has(JWT.sub)"},
                {"check_expr": "JWT.sub == 'alice'"},
            ])),
        )
        .unwrap();

        assert!(!rejecter.reject(&claims(json!({"sub": "alice"}))));
        assert!(rejecter.reject(&claims(json!({"sub": "bob"}))));
        assert!(rejecter.reject(&claims(json!({}))));
    }

    #[test]
    fn test_non_boolean_rejects() {
        let rejecter = ClaimsRejecter::new("/a", &extra(json!([{"check_expr": "JWT.sub"}]))).unwrap();
        assert!(!rejecter.reject(&claims(json!({"sub": true}))));
        assert!(rejecter.reject(&claims(json!({"sub": "yes"}))));
        assert!(rejecter.reject(&claims(json!({"sub": 1}))));
    }

    #[test]
    fn test_reject_claims_without_rejecter() {
        assert!(!reject_claims(None, &claims(json!({}))));

        let rejecter = ClaimsRejecter::new("/a", &extra(json!([{"check_expr": "has(JWT.sub)"}])));
        assert!(reject_claims(rejecter.as_ref(), &claims(json!({}))));
    }
}
