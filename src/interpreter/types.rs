use crate::ast::Position;
use thiserror::Error;

/// Mirrors `legacy_src/interpreter/errors.rs`'s per-variant-struct +
/// aggregate-enum pattern: each failure mode names exactly the fields
/// the error taxonomy requires (kind, message, position,
/// and for calling-convention errors the function/argument identity).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpreterError {
    #[error("{pos}: unknown variable '{name}'")]
    UnknownVariable { name: String, pos: Position },

    #[error("{pos}: unknown function '{name}'")]
    UnknownFunction { name: String, pos: Position },

    #[error("{pos}: unknown method '{method}' on {type_name}")]
    UnknownMethod { method: String, type_name: String, pos: Position },

    #[error("{pos}: {function}(): argument {which} expected {expected}, got {got}")]
    ArgTypeMismatch { function: String, which: String, expected: String, got: String, pos: Position },

    #[error("{pos}: {function}(): missing required argument '{name}'")]
    MissingArgument { function: String, name: String, pos: Position },

    #[error("{pos}: {function}(): too many positional arguments")]
    TooManyArguments { function: String, pos: Position },

    #[error("{pos}: {function}(): unknown keyword argument '{name}'")]
    UnknownNamedArgument { function: String, name: String, pos: Position },

    #[error("{pos}: operator {op} is not defined for {left} and {right}")]
    BadOperandTypes { op: String, left: String, right: String, pos: Position },

    #[error("{pos}: if/elif condition must be a bool, got {got}")]
    NonBooleanCondition { got: String, pos: Position },

    #[error("{pos}: '{keyword}' used outside a loop")]
    LoopControlOutsideLoop { keyword: String, pos: Position },

    #[error("{pos}: duplicate target name '{name}' in this (sub)project")]
    DuplicateTarget { name: String, pos: Position },

    #[error("{1}: {0}")]
    MethodError(String, Position),

    #[error("{pos}: {message}")]
    Value { message: String, pos: Position },

    #[error("{pos}: required dependency '{name}' not found")]
    DependencyNotFound { name: String, pos: Position },

    #[error("{0}")]
    Option(#[from] crate::options::OptionError),

    #[error("{0}")]
    Graph(String),
}

impl InterpreterError {
    pub fn pos(&self) -> Option<Position> {
        match self {
            InterpreterError::UnknownVariable { pos, .. }
            | InterpreterError::UnknownFunction { pos, .. }
            | InterpreterError::UnknownMethod { pos, .. }
            | InterpreterError::ArgTypeMismatch { pos, .. }
            | InterpreterError::MissingArgument { pos, .. }
            | InterpreterError::TooManyArguments { pos, .. }
            | InterpreterError::UnknownNamedArgument { pos, .. }
            | InterpreterError::BadOperandTypes { pos, .. }
            | InterpreterError::NonBooleanCondition { pos, .. }
            | InterpreterError::LoopControlOutsideLoop { pos, .. }
            | InterpreterError::DuplicateTarget { pos, .. }
            | InterpreterError::MethodError(_, pos)
            | InterpreterError::Value { pos, .. }
            | InterpreterError::DependencyNotFound { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}

/// Non-local control flow for `break`/`continue` inside `foreach`,
/// threaded back up through statement evaluation the way
/// `legacy_src/interpreter/errors.rs`'s `ControlFlowError` trait
/// distinguishes control flow from genuine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
}
