use std::fmt;

/// Source position of a token within a workload script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// A workload script failed to parse. Parsing aborts on the first error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at {position})")]
pub struct ParseError {
    pub position: Position,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("this variable is not defined: {0}")]
    UndefinedVariable(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("in {call}: expected at least {want} arguments, got {got}")]
    Arity { call: String, want: usize, got: usize },

    #[error("in {call}: expected an int or float, got {value}")]
    NotANumber { call: String, value: String },

    #[error("in {call}: {message}")]
    InvalidArgument { call: String, message: String },
}
