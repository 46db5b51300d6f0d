use cel_interpreter::Program;
use std::sync::Arc;

/// A checked, ready-to-run expression.
///
/// Cloning is cheap and clones share the same program, so one compiled expression can be
/// evaluated by any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: Arc<str>,
    program: Arc<Program>,
}

impl CompiledExpression {
    pub(crate) fn new(source: &str, program: Program) -> Self {
        Self {
            source: Arc::from(source),
            program: Arc::new(program),
        }
    }

    /// The expression text this program was compiled from
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }
}
