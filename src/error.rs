use thiserror::Error;

use crate::lexer::LexError;

/// Faults inside the compiler itself. User mistakes in the source program
/// are reported as diagnostics and never end up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Internal compiler error: {0}")]
    Lexer(#[from] LexError),
    #[error("Internal compiler error: {message}")]
    InternalCompilerError { message: String },
}

impl CompileError {
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::InternalCompilerError {
            message: message.into(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
