// Remapgen Core - Compile Errors
// Generation-time failures; every one of them aborts the run

use crate::operand::OperandKind;

/// Errors raised while compiling rule annotations into dispatch classes.
///
/// Each variant carries the rule and operation it was raised for so the
/// driver can report the offending line without extra bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("rule '{rule}': {operation}: unknown datatype '{token}'")]
    UnknownOperandCategory {
        rule: String,
        operation: String,
        token: String,
    },

    #[error("rule '{rule}': {operation}: group '{group}' mixes {expected} and {found}")]
    OperandKindMismatch {
        rule: String,
        operation: String,
        group: String,
        expected: OperandKind,
        found: OperandKind,
    },

    #[error("rule '{rule}': {operation}: unknown symbol '{token}'")]
    UnresolvedSymbol {
        rule: String,
        operation: String,
        token: String,
    },

    #[error("rule '{rule}': unknown operation '{operation}'")]
    UnknownOperation { rule: String, operation: String },
}

impl CompileError {
    /// Name of the rule the error was raised for
    pub fn rule(&self) -> &str {
        match self {
            CompileError::UnknownOperandCategory { rule, .. }
            | CompileError::OperandKindMismatch { rule, .. }
            | CompileError::UnresolvedSymbol { rule, .. }
            | CompileError::UnknownOperation { rule, .. } => rule,
        }
    }

    /// Name of the operation the error was raised for
    pub fn operation(&self) -> &str {
        match self {
            CompileError::UnknownOperandCategory { operation, .. }
            | CompileError::OperandKindMismatch { operation, .. }
            | CompileError::UnresolvedSymbol { operation, .. }
            | CompileError::UnknownOperation { operation, .. } => operation,
        }
    }
}
