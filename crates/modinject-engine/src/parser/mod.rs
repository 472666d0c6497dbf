//! Module source language front end
//!
//! - **token**: token and span definitions
//! - **lexer**: logos-based tokenizer
//! - **ast**: statement and expression tree
//! - **parser**: recursive descent parser with statement-level recovery

pub mod ast;
pub mod error;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod token;

pub use ast::Program;
pub use error::{ParseError, ParseErrorKind};
pub use lexer::{LexError, Lexer};
pub use parser::Parser;
pub use token::{Span, Token};

use crate::vm::RaisedError;

/// Parse `source` into a [`Program`], reporting the first problem as a
/// `SyntaxError` that names `filename`.
pub fn parse_program(source: &str, filename: &str) -> Result<Program, RaisedError> {
    let parser = Parser::new(source).map_err(|errors| {
        let first = errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "invalid token".to_string());
        RaisedError::syntax(filename, first)
    })?;
    parser.parse().map_err(|errors| {
        let first = errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "invalid syntax".to_string());
        RaisedError::syntax(filename, first)
    })
}
