//! Turning definitions into checked programs and per-phase chains

use super::diagnostics::{Diagnostics, LogDiagnostics};
use super::environment::TypeEnvironment;
use super::{CompiledExpression, EvaluatorChain, Phase};
use crate::config::Definition;
use cel_interpreter::Program;
use cel_parser::{Expression, Parser};
use core::any::Any;
use core::fmt;
use std::panic;
use std::sync::Arc;
use strum::Display;

const LOG_TARGET: &str = "  compiler";

/// Which text of a [`Definition`] a compiler reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExpressionSlot {
    /// `check_expr`, the boolean gate expression
    Check,

    /// `mod_expr`, reserved; compiled on request but never evaluated
    Modification,
}

impl ExpressionSlot {
    #[must_use]
    pub fn select(self, definition: &Definition) -> &str {
        match self {
            Self::Check => &definition.check_expression,
            Self::Modification => &definition.mod_expression,
        }
    }
}

/// Why a definition could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The selected expression text is empty
    NoExpression,

    /// The expression is not syntactically valid
    Parse(String),

    /// The expression refers to something the environment does not declare, or its
    /// operand types do not fit
    Check(String),
}

impl CompileError {
    /// Soft failures skip a single definition, everything else aborts the whole chain.
    #[must_use]
    pub const fn is_soft(&self) -> bool {
        matches!(self, Self::NoExpression | Self::Check(_))
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExpression => write!(f, "cel: no expression"),
            Self::Parse(diagnostic) => write!(f, "cel: error parsing the expression: {diagnostic}"),
            Self::Check(diagnostic) => write!(f, "cel: error checking the expression and its param definition: {diagnostic}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Compiles one slot of expression definitions against the fixed type environment.
#[derive(Debug, Clone)]
pub struct Compiler {
    slot: ExpressionSlot,
    environment: TypeEnvironment,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Compiler {
    #[must_use]
    pub fn new(slot: ExpressionSlot) -> Self {
        Self {
            slot,
            environment: TypeEnvironment::standard(),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    #[must_use]
    pub fn for_checks() -> Self {
        Self::new(ExpressionSlot::Check)
    }

    #[must_use]
    pub fn for_modifications() -> Self {
        Self::new(ExpressionSlot::Modification)
    }

    /// Send check diagnostics to a different sink.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    #[must_use]
    pub const fn slot(&self) -> ExpressionSlot {
        self.slot
    }

    /// Parse and check a single definition.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::NoExpression`] for empty text, [`CompileError::Parse`] on a
    /// syntax error, and [`CompileError::Check`] when the expression refers to an
    /// undeclared identifier or an unknown function, or applies an operator to operands
    /// of the wrong type.
    pub fn compile(&self, definition: &Definition) -> Result<CompiledExpression, CompileError> {
        let source = self.slot.select(definition);
        if source.is_empty() {
            return Err(CompileError::NoExpression);
        }

        let (expression, program) = parse(source)?;

        if let Err(diagnostic) = self.environment.check(&expression, source) {
            self.diagnostics.report(&diagnostic);
            return Err(CompileError::Check(diagnostic));
        }

        Ok(CompiledExpression::new(source, program))
    }

    /// Build the chain for one phase from every definition whose selected text mentions the
    /// phase's prefix.
    ///
    /// Definitions failing softly are skipped, order is otherwise preserved.
    ///
    /// # Errors
    ///
    /// Returns the first hard [`CompileError`]
    pub fn compile_phase(&self, definitions: &[Definition], phase: Phase) -> Result<EvaluatorChain, CompileError> {
        let mut expressions = Vec::new();

        for definition in definitions {
            if !phase.selects(self.slot.select(definition)) {
                continue;
            }

            match self.compile(definition) {
                Ok(expr) => expressions.push(expr),
                Err(e) if e.is_soft() => {
                    log::info!(target: LOG_TARGET, "Skipping {phase} {} expression: {e}", self.slot);
                }
                Err(e) => return Err(e),
            }
        }

        log::debug!(target: LOG_TARGET, "Compiled {} {phase} {} expression(s)", expressions.len(), self.slot);
        Ok(EvaluatorChain::new(phase, expressions))
    }

    /// # Errors
    ///
    /// Returns the first hard [`CompileError`]
    pub fn compile_pre(&self, definitions: &[Definition]) -> Result<EvaluatorChain, CompileError> {
        self.compile_phase(definitions, Phase::Pre)
    }

    /// # Errors
    ///
    /// Returns the first hard [`CompileError`]
    pub fn compile_post(&self, definitions: &[Definition]) -> Result<EvaluatorChain, CompileError> {
        self.compile_phase(definitions, Phase::Post)
    }

    /// # Errors
    ///
    /// Returns the first hard [`CompileError`]
    pub fn compile_claims(&self, definitions: &[Definition]) -> Result<EvaluatorChain, CompileError> {
        self.compile_phase(definitions, Phase::Claims)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::for_checks()
    }
}

/// Parse `source` into the syntax tree that gets checked and the program that gets evaluated.
///
/// The ANTLR runtime under the parser panics on some truncated inputs such as `a ==`.
/// Those panics are contained here and reported as parse errors.
fn parse(source: &str) -> Result<(Expression, Program), CompileError> {
    let parsed = panic::catch_unwind(|| {
        let expression = Parser::new().parse(source)?;
        Program::compile(source).map(|program| (expression, program))
    });

    match parsed {
        Ok(result) => result.map_err(|e| CompileError::Parse(e.to_string())),
        Err(payload) => Err(CompileError::Parse(panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "the parser could not recover from a syntax error".to_string())
}
