use std::io;

use thiserror::Error;

use crate::bytecode::DecodeError;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Fatal interpreter failures. Failed asserts are not errors; they are
/// reported through the output sink and execution carries on.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Invalid integer input '{token}'")]
    InvalidIntegerInput { token: String },
    #[error("Input ended before a value could be read")]
    InputExhausted,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Internal compiler error: {message}")]
    InternalCompilerError { message: String },
}

impl RuntimeError {
    pub fn internal(message: impl Into<String>) -> Self {
        RuntimeError::InternalCompilerError {
            message: message.into(),
        }
    }

    /// True when the fault comes from a malformed instruction stream rather
    /// than from the running program or its input.
    pub fn is_internal(&self) -> bool {
        matches!(self, RuntimeError::InternalCompilerError { .. })
    }
}

impl From<DecodeError> for RuntimeError {
    fn from(error: DecodeError) -> Self {
        RuntimeError::internal(error.to_string())
    }
}
