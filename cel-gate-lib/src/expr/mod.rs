//! Expression compilation and evaluation using CEL
//!
//! Operators attach CEL (Common Expression Language) expressions to a route. Each
//! expression is routed to one pipeline phase by the reserved prefix its text mentions:
//!
//! - `req` expressions run before the request reaches the wrapped handler
//! - `resp` expressions run after the wrapped handler responded
//! - `JWT` expressions validate authentication claims
//!
//! # Implementation Model
//!
//! A [`Compiler`] parses every expression when a route is built and type checks it
//! against a [`TypeEnvironment`] that is identical for every route. The programs of one
//! phase form an [`EvaluatorChain`]. For each call an [`Activation`] binds the
//! declared identifiers to the call's data, and the chain evaluates its programs in
//! order, stopping at the first one that does not return boolean `true`.
//!
//! Compiled programs are shared read-only between concurrent calls. Activations and
//! interpreter contexts are created per evaluation and never reused.

mod activation;
mod chain;
mod checker;
mod compiled_expression;
mod compiler;
pub(crate) mod diagnostics;
mod environment;
mod functions;

pub use activation::{Activation, Clock, format_timestamp, json_to_value};
pub use chain::{ChainOutcome, EvaluatorChain, Rejection, is_accepted};
pub use compiled_expression::CompiledExpression;
pub use compiler::{CompileError, Compiler, ExpressionSlot};
pub use diagnostics::{Diagnostics, LogDiagnostics};
pub use environment::{CelType, DECLARATIONS, FUNCTIONS, OPERATORS, Phase, TypeEnvironment};
pub use functions::WEEKDAY;
