pub mod ast;
pub mod bytecode;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod semantic;
pub mod source;
pub mod token;
pub mod vm;

pub use config::Config;
pub use pipeline::{Compilation, compile, execute};
