use thiserror::Error;

/// Contract violations raised by the lexer. Malformed input never produces a
/// `LexError`; it is reported as a lexical diagnostic instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Backtrack depth of {depth} tokens exceeded")]
    BacktrackOverflow { depth: usize },
    #[error("Lexer invariant violated: {message}")]
    InvariantViolation { message: &'static str },
}

pub type LexResult<T> = Result<T, LexError>;
