use mash::Address;

use crate::fragment::EvaluationError;
use crate::script::ast::Position;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("{function}() takes {expected} argument(s), got {got}")]
    ArityMismatch {
        function: String,
        expected: usize,
        got: usize,
    },
    #[error("type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("{0}")]
    Failed(String),
    #[error("I/O error: {0}")]
    Io(String),
}

/// A script error together with where in the fragment it happened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {}: {error}", .position.line)]
pub struct FragmentError {
    pub error: ScriptError,
    pub position: Position,
}

impl FragmentError {
    pub fn new(error: ScriptError, position: Position) -> Self {
        FragmentError { error, position }
    }

    pub fn syntax(message: impl Into<String>, position: Position) -> Self {
        FragmentError::new(ScriptError::Syntax(message.into()), position)
    }

    /// Re-anchor onto the document, given where the fragment starts and
    /// how much indentation each of its lines lost.
    pub fn at(self, address: &Address, indents: &[usize]) -> EvaluationError {
        let line = self.position.line.max(1);
        let indent = indents.get(line - 1).copied().unwrap_or(0);
        EvaluationError::new(
            self.error.to_string(),
            address.shifted(line, self.position.column + indent),
        )
    }
}
