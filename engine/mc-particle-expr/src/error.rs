//! Error types for compiling and evaluating expressions

use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised while compiling a formula into an evaluation plan
///
/// Every variant carries the offending token text and its byte offset in the
/// source string so load reports can point at the exact spot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A character that does not start any token of the language
    #[error("unexpected character `{token}` at offset {offset}")]
    UnexpectedChar { token: String, offset: usize },

    /// A numeric literal that could not be parsed
    #[error("invalid number literal `{token}` at offset {offset}")]
    InvalidNumber { token: String, offset: usize },

    /// A token that is valid on its own but not at this position
    #[error("unexpected `{token}` at offset {offset}, expected {expected}")]
    UnexpectedToken {
        token: String,
        offset: usize,
        expected: &'static str,
    },

    /// A bare name that is neither a keyword nor declared by the scope
    #[error("unknown identifier `{token}` at offset {offset}")]
    UnknownIdentifier { token: String, offset: usize },

    /// A function outside the allow-list
    #[error("unknown function `{token}` at offset {offset}")]
    UnknownFunction { token: String, offset: usize },

    /// An accessor the receiver kind does not expose
    #[error("`{token}` at offset {offset} is not an accessor of {kind}")]
    UnknownAccessor {
        token: String,
        offset: usize,
        kind: ValueKind,
    },

    /// `$N` where `N` is not bound by the scope
    #[error("variable `{token}` at offset {offset} is out of range (scope binds {arity} values)")]
    SlotOutOfRange {
        token: String,
        offset: usize,
        arity: usize,
    },

    /// Wrong number of call arguments
    #[error("`{token}` at offset {offset} takes {expected} argument(s), got {found}")]
    Arity {
        token: String,
        offset: usize,
        expected: usize,
        found: usize,
    },

    /// Operand types do not fit the operator or call
    #[error("type mismatch at `{token}` (offset {offset}): expected {expected}, found {found}")]
    TypeMismatch {
        token: String,
        offset: usize,
        expected: &'static str,
        found: ValueKind,
    },

    /// Parentheses, unary operators or ternaries nested past the limit
    #[error("nesting deeper than {limit} levels at `{token}` (offset {offset})")]
    TooDeep {
        token: String,
        offset: usize,
        limit: usize,
    },

    /// More tokens than a single formula may hold
    #[error("formula longer than {limit} tokens, at `{token}` (offset {offset})")]
    TooLong {
        token: String,
        offset: usize,
        limit: usize,
    },
}

impl CompileError {
    /// Byte offset of the offending token
    pub fn offset(&self) -> usize {
        match self {
            Self::UnexpectedChar { offset, .. }
            | Self::InvalidNumber { offset, .. }
            | Self::UnexpectedToken { offset, .. }
            | Self::UnknownIdentifier { offset, .. }
            | Self::UnknownFunction { offset, .. }
            | Self::UnknownAccessor { offset, .. }
            | Self::SlotOutOfRange { offset, .. }
            | Self::Arity { offset, .. }
            | Self::TypeMismatch { offset, .. }
            | Self::TooDeep { offset, .. }
            | Self::TooLong { offset, .. } => *offset,
        }
    }

    /// Text of the offending token
    pub fn token(&self) -> &str {
        match self {
            Self::UnexpectedChar { token, .. }
            | Self::InvalidNumber { token, .. }
            | Self::UnexpectedToken { token, .. }
            | Self::UnknownIdentifier { token, .. }
            | Self::UnknownFunction { token, .. }
            | Self::UnknownAccessor { token, .. }
            | Self::SlotOutOfRange { token, .. }
            | Self::Arity { token, .. }
            | Self::TypeMismatch { token, .. }
            | Self::TooDeep { token, .. }
            | Self::TooLong { token, .. } => token,
        }
    }
}

/// Errors raised while evaluating a compiled plan
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The environment binds a different number of values than the scope
    #[error("expression expects {expected} bound values, environment has {found}")]
    ArityMismatch { expected: usize, found: usize },

    /// A bound value has a different kind than the scope declared
    #[error("slot ${slot} expects {expected}, environment supplies {found}")]
    BindingMismatch {
        slot: usize,
        expected: ValueKind,
        found: ValueKind,
    },

    /// Integer division or remainder by zero
    #[error("integer division by zero")]
    DivideByZero,

    /// The result is NaN or infinite
    #[error("non-finite result {0}")]
    NonFinite(f64),

    /// A random draw was asked for an empty range
    #[error("invalid argument to {function}: {value}")]
    InvalidArgument { function: &'static str, value: i64 },
}

/// Errors raised while parsing a block-state condition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    /// A character that does not start any condition token
    #[error("unexpected character `{token}` at offset {offset}")]
    UnexpectedChar { token: String, offset: usize },

    /// A token that is not valid at this position
    #[error("unexpected `{token}` at offset {offset}, expected {expected}")]
    UnexpectedToken {
        token: String,
        offset: usize,
        expected: &'static str,
    },

    /// Parentheses or negations nested past the limit
    #[error("nesting deeper than {limit} levels at `{token}` (offset {offset})")]
    TooDeep {
        token: String,
        offset: usize,
        limit: usize,
    },

    /// More tokens than a single condition may hold
    #[error("condition longer than {limit} tokens, at `{token}` (offset {offset})")]
    TooLong {
        token: String,
        offset: usize,
        limit: usize,
    },
}

/// Result type for compilation
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let error = CompileError::UnknownFunction {
            token: "exec".to_string(),
            offset: 4,
        };
        assert_eq!(error.to_string(), "unknown function `exec` at offset 4");
        assert_eq!(error.offset(), 4);
        assert_eq!(error.token(), "exec");
    }

    #[test]
    fn test_binding_mismatch_display() {
        let error = EvalError::BindingMismatch {
            slot: 2,
            expected: ValueKind::BlockPos,
            found: ValueKind::Double,
        };
        assert_eq!(
            error.to_string(),
            "slot $2 expects BlockPos, environment supplies double"
        );
    }
}
