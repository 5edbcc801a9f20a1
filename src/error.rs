use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Runtime error: {kind}")]
pub struct InterpreterError {
    pub kind: InterpreterErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpreterErrorKind {
    #[error("Redeclared variable '{0}'")]
    RedeclaredVariable(String),
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),
    /// `operands` is the operand type name, or both joined with "and".
    #[error("Unsupported operator '{operator}' on {operands}")]
    TypeMismatch { operator: String, operands: String },
    #[error("{0} is immutable")]
    ImmutableTarget(&'static str),
    #[error("Value of type {0} is not callable")]
    NotCallable(&'static str),
    #[error("Expected {expected} argument(s) but got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("Cannot access `{0}` inside an unbound function")]
    UnboundThis(&'static str),
    #[error("Cannot `return` outside a function body")]
    IllegalReturn,
    #[error("Superclass '{0}' is not a class")]
    NotAClass(String),
    #[error("Failed to write output: {0}")]
    Output(String),
}

impl From<InterpreterErrorKind> for InterpreterError {
    fn from(kind: InterpreterErrorKind) -> Self {
        InterpreterError { kind }
    }
}

impl From<std::io::Error> for InterpreterError {
    fn from(error: std::io::Error) -> Self {
        InterpreterErrorKind::Output(error.to_string()).into()
    }
}

pub type EvaluationResult<T = crate::value::Value> = Result<T, InterpreterError>;
