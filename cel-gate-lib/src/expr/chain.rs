//! Ordered, short-circuiting evaluation of compiled expressions

use super::{Activation, CompiledExpression, Phase};
use cel_interpreter::{Context, ExecutionError, ResolveResult, Value};
use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

const LOG_TARGET: &str = "     chain";

/// The one rule deciding whether an evaluation result lets a call through.
///
/// Only a boolean `true` passes. `false`, values of any other type, and evaluation
/// errors all reject.
#[must_use]
pub fn is_accepted(result: &ResolveResult) -> bool {
    matches!(result, Ok(Value::Bool(true)))
}

/// Why an expression did not let a call through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    False,
    NotBoolean(String),
    Failed(String),
}

impl Rejection {
    // Only called for results `is_accepted` turned down
    fn classify(result: &ResolveResult) -> Self {
        match result {
            Ok(Value::Bool(_)) => Self::False,
            Ok(other) => Self::NotBoolean(format!("{other:?}")),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::False => write!(f, "evaluated to false"),
            Self::NotBoolean(value) => write!(f, "did not return a boolean, got '{value}' instead"),
            Self::Failed(e) => write!(f, "could not be evaluated: {e}"),
        }
    }
}

/// The result of running a chain against one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every expression evaluated to `true`
    Accepted { evaluated: usize },

    /// The expression at `index` rejected the call; later expressions were not evaluated
    Rejected {
        index: usize,
        expression: Arc<str>,
        reason: Rejection,
    },
}

impl ChainOutcome {
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// How many expressions were evaluated to reach this outcome.
    #[must_use]
    pub const fn evaluated(&self) -> usize {
        match self {
            Self::Accepted { evaluated } => *evaluated,
            Self::Rejected { index, .. } => *index + 1,
        }
    }
}

/// The compiled expressions of one phase, in configuration order.
#[derive(Debug, Clone)]
pub struct EvaluatorChain {
    phase: Phase,
    expressions: Vec<CompiledExpression>,
}

impl EvaluatorChain {
    #[must_use]
    pub const fn new(phase: Phase, expressions: Vec<CompiledExpression>) -> Self {
        Self { phase, expressions }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn expressions(&self) -> &[CompiledExpression] {
        &self.expressions
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.expressions.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Evaluate the expressions top to bottom, stopping at the first one that does not accept.
    ///
    /// The interpreter context lives only for the duration of this call.
    #[must_use]
    pub fn evaluate(&self, activation: &Activation) -> ChainOutcome {
        if self.expressions.is_empty() {
            return ChainOutcome::Accepted { evaluated: 0 };
        }

        self.evaluate_in(&activation.to_context())
    }

    pub(crate) fn evaluate_in(&self, context: &Context<'_>) -> ChainOutcome {
        for (index, expr) in self.expressions.iter().enumerate() {
            let result = execute(expr, context);
            if !is_accepted(&result) {
                return ChainOutcome::Rejected {
                    index,
                    expression: Arc::from(expr.expression()),
                    reason: Rejection::classify(&result),
                };
            }

            log::debug!(target: LOG_TARGET, "{} expression '{}' accepted", self.phase, expr.expression());
        }

        ChainOutcome::Accepted {
            evaluated: self.expressions.len(),
        }
    }
}

/// Run one program. The interpreter panics on a few constructs it does not support, such
/// as iterating over a string; those count as evaluation errors.
fn execute(expr: &CompiledExpression, context: &Context<'_>) -> ResolveResult {
    panic::catch_unwind(AssertUnwindSafe(|| expr.program().execute(context)))
        .unwrap_or_else(|_| Err(ExecutionError::function_error(expr.expression(), "evaluation aborted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_interpreter::Program;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chain(phase: Phase, sources: &[&str]) -> EvaluatorChain {
        EvaluatorChain::new(
            phase,
            sources
                .iter()
                .map(|s| CompiledExpression::new(s, Program::compile(s).unwrap()))
                .collect(),
        )
    }

    fn claims(value: serde_json::Value) -> Activation {
        Activation::for_claims(value.as_object().unwrap(), "2018-12-10T00:00:00Z")
    }

    #[test]
    fn test_is_accepted() {
        assert!(is_accepted(&Ok(Value::Bool(true))));
        assert!(!is_accepted(&Ok(Value::Bool(false))));
        assert!(!is_accepted(&Ok(Value::Int(1))));
        assert!(!is_accepted(&Ok(Value::String(Arc::new("true".to_string())))));
        assert!(!is_accepted(&Err(ExecutionError::function_error("f", "boom"))));
    }

    #[test]
    fn test_empty_chain_accepts() {
        let outcome = chain(Phase::Claims, &[]).evaluate(&Activation::default());
        assert_eq!(outcome, ChainOutcome::Accepted { evaluated: 0 });
        assert!(outcome.is_accepted());
    }

    #[test]
    fn test_all_true_accepts() {
        let outcome = chain(Phase::Claims, &["has(JWT.sub)", "JWT.sub == 'alice'"]).evaluate(&claims(serde_json::json!({"sub": "alice"})));
        assert_eq!(outcome, ChainOutcome::Accepted { evaluated: 2 });
    }

    #[test]
    fn test_short_circuits_on_false() {
        let c = chain(Phase::Claims, &["JWT.sub == 'alice'", "JWT.sub == 'bob'", "JWT.missing == 1"]);
        let outcome = c.evaluate(&claims(serde_json::json!({"sub": "alice"})));

        assert_eq!(
            outcome,
            ChainOutcome::Rejected {
                index: 1,
                expression: Arc::from("JWT.sub == 'bob'"),
                reason: Rejection::False,
            }
        );
        assert_eq!(outcome.evaluated(), 2);
        assert!(!outcome.is_accepted());
    }

    #[test]
    fn test_short_circuit_stops_evaluating() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut context = Activation::default().to_context();
        context.add_function("tick", move |pass: bool| -> ResolveResult {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Bool(pass))
        });

        let c = chain(Phase::Pre, &["tick(true)", "tick(false)", "tick(true)", "tick(true)"]);
        let outcome = c.evaluate_in(&context);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.evaluated(), 2);

        let accepting = chain(Phase::Pre, &["tick(true)", "tick(true)"]);
        assert!(accepting.evaluate_in(&context).is_accepted());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_interpreter_panic_rejects() {
        let outcome = chain(Phase::Claims, &["JWT.sub.all(c, true)"]).evaluate(&claims(serde_json::json!({"sub": "alice"})));
        let ChainOutcome::Rejected { reason, .. } = outcome else {
            panic!("expected rejection");
        };
        assert!(matches!(reason, Rejection::Failed(_)));
    }

    #[test]
    fn test_non_boolean_rejects() {
        let outcome = chain(Phase::Claims, &["JWT.sub"]).evaluate(&claims(serde_json::json!({"sub": "alice"})));
        let ChainOutcome::Rejected { reason, .. } = outcome else {
            panic!("expected rejection");
        };
        assert!(matches!(reason, Rejection::NotBoolean(_)));
    }

    #[test]
    fn test_evaluation_error_rejects() {
        let outcome = chain(Phase::Claims, &["JWT.missing == 1", "true"]).evaluate(&claims(serde_json::json!({})));
        let ChainOutcome::Rejected { index, reason, .. } = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(index, 0);
        assert!(matches!(reason, Rejection::Failed(_)));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let c = chain(Phase::Claims, &["has(JWT.sub)", "JWT.sub == 'bob'"]);
        let activation = claims(serde_json::json!({"sub": "alice"}));
        assert_eq!(c.evaluate(&activation), c.evaluate(&activation));
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(Rejection::False.to_string(), "evaluated to false");
        assert!(Rejection::NotBoolean("Int(1)".to_string()).to_string().contains("Int(1)"));
    }

    #[test]
    fn test_accessors() {
        let c = chain(Phase::Post, &["resp_completed"]);
        assert_eq!(c.phase(), Phase::Post);
        assert_eq!(c.len(), 1);
        assert!(!c.is_empty());
        assert_eq!(c.expressions()[0].expression(), "resp_completed");
    }
}
