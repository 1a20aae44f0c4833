//! Guard error types

/// Errors that can occur while parsing or evaluating a guard condition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuardError {
    #[error("Parse error at line {line}, column {col}: {message}")]
    ParseError {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("Unexpected token: expected {expected}, found '{found}'")]
    UnexpectedToken { expected: String, found: String },

    #[error("Unexpected end of input: expected {0}")]
    UnexpectedEof(String),

    #[error("Unknown binding: '{0}'")]
    UnknownBinding(String),

    #[error("Unknown attribute '{attribute}' on '{binding}'")]
    UnknownAttribute { binding: String, attribute: String },

    #[error("Cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("Condition is {len} characters long, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("Condition nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("Invalid number literal: '{0}'")]
    InvalidNumber(String),
}

/// Result type alias for guard operations
pub type GuardResult<T> = Result<T, GuardError>;
