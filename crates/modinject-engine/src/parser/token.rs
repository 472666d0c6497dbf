//! Token definitions for the module source language.
//!
//! Tokens are produced by the [`Lexer`](crate::parser::Lexer) and consumed by
//! the recursive descent [`Parser`](crate::parser::Parser).

use std::fmt;

/// A token in module source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Import,
    From,
    As,
    Raise,
    Assert,
    Pass,
    Del,
    Not,
    True,
    False,
    None,

    // Literals
    Identifier(String),
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    // Operators
    EqualEqual,
    BangEqual,
    Equal,
    Plus,
    Star,
    Dot,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    // Statement separators
    Newline,
    Semicolon,

    Eof,
}

impl Token {
    /// Whether this token ends a statement.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Token::Newline | Token::Semicolon | Token::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Import => write!(f, "import"),
            Token::From => write!(f, "from"),
            Token::As => write!(f, "as"),
            Token::Raise => write!(f, "raise"),
            Token::Assert => write!(f, "assert"),
            Token::Pass => write!(f, "pass"),
            Token::Del => write!(f, "del"),
            Token::Not => write!(f, "not"),
            Token::True => write!(f, "True"),
            Token::False => write!(f, "False"),
            Token::None => write!(f, "None"),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::IntLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "{:?}", s),
            Token::EqualEqual => write!(f, "=="),
            Token::BangEqual => write!(f, "!="),
            Token::Equal => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Star => write!(f, "*"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::Newline => write!(f, "newline"),
            Token::Semicolon => write!(f, ";"),
            Token::Eof => write!(f, "end of file"),
        }
    }
}

/// Source location of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
