//! Parse error types.

use crate::parser::token::{Span, Token};
use std::fmt;

/// A parse error with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// A specific token was required but something else was found
    UnexpectedToken { expected: String, found: Token },

    /// Statement continues past where it should have ended
    ExpectedEndOfStatement { found: Token },

    /// Left-hand side of `=` is not a plain name
    InvalidAssignmentTarget,

    /// `from import x` with neither dots nor a module path
    MissingModulePath,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, found } => {
                write!(f, "expected {}, found {} at {}", expected, found, self.span)
            }
            ParseErrorKind::ExpectedEndOfStatement { found } => {
                write!(f, "expected end of statement, found {} at {}", found, self.span)
            }
            ParseErrorKind::InvalidAssignmentTarget => {
                write!(f, "cannot assign to expression at {}", self.span)
            }
            ParseErrorKind::MissingModulePath => {
                write!(f, "missing module path after 'from' at {}", self.span)
            }
        }
    }
}

impl std::error::Error for ParseError {}
