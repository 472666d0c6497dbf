//! Lexer for module source text.
//!
//! Built on the logos library. Newlines are significant (they end
//! statements) except inside brackets, where they are dropped so that
//! `from pkg import (\n a,\n b\n)` reads as a single statement.

use crate::parser::token::{Span, Token};
use logos::Logos;
use thiserror::Error;

/// Logos-based token enum for lexing.
///
/// Converted to the public [`Token`] enum after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace and line continuations (skip)
    #[regex(r"[ \t\f\r]+", logos::skip)]
    #[regex(r"\\\r?\n", logos::skip)]
    Whitespace,

    #[regex(r"#[^\n]*", logos::skip)]
    Comment,

    #[token("\n")]
    Newline,

    // Keywords (must come before identifiers)
    #[token("import")]
    Import,

    #[token("from")]
    From,

    #[token("as")]
    As,

    #[token("raise")]
    Raise,

    #[token("assert")]
    Assert,

    #[token("pass")]
    Pass,

    #[token("del")]
    Del,

    #[token("not")]
    Not,

    #[token("True")]
    TrueKw,

    #[token("False")]
    FalseKw,

    #[token("None")]
    NoneKw,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"[0-9][0-9_]*", parse_int)]
    IntLiteral(i64),

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", parse_float)]
    FloatLiteral(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unquote(lex.slice(), 1))]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| unquote(lex.slice(), 1))]
    #[token(r#"""""#, |lex| lex_triple(lex, r#"""""#))]
    #[token("'''", |lex| lex_triple(lex, "'''"))]
    StringLiteral(String),

    #[token("==")]
    EqualEqual,

    #[token("!=")]
    BangEqual,

    #[token("=")]
    Equal,

    #[token("+")]
    Plus,

    #[token("*")]
    Star,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token(";")]
    Semicolon,
}

fn parse_int(lex: &mut logos::Lexer<'_, LogosToken>) -> Option<i64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_float(lex: &mut logos::Lexer<'_, LogosToken>) -> Option<f64> {
    lex.slice().replace('_', "").parse().ok()
}

/// Strip `quote_len` quote characters from both ends and resolve escapes.
fn unquote(slice: &str, quote_len: usize) -> String {
    unescape(&slice[quote_len..slice.len() - quote_len])
}

/// Consume a triple-quoted string body up to and including the closing
/// delimiter.
fn lex_triple(lex: &mut logos::Lexer<'_, LogosToken>, delimiter: &str) -> Option<String> {
    let remainder = lex.remainder();
    match remainder.find(delimiter) {
        Some(end) => {
            let body = unescape(&remainder[..end]);
            lex.bump(end + delimiter.len());
            Some(body)
        }
        None => {
            // Unterminated: swallow the rest so the error is reported once
            lex.bump(remainder.len());
            None
        }
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{char}' at {span}")]
    UnexpectedCharacter { char: char, span: Span },

    #[error("unterminated string literal at {span}")]
    UnterminatedString { span: Span },

    #[error("invalid number literal '{text}' at {span}")]
    InvalidNumber { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

/// Tokenizer over a module's source text.
pub struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<(Token, Span)>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the whole source, returning every error found on failure.
    pub fn tokenize(mut self) -> Result<Vec<(Token, Span)>, Vec<LexError>> {
        let mut logos_lexer = LogosToken::lexer(self.source);
        let mut line = 1u32;
        let mut column = 1u32;
        let mut last_end = 0;
        let mut depth = 0usize;

        while let Some(token_result) = logos_lexer.next() {
            let range = logos_lexer.span();

            advance(&self.source[last_end..range.start], &mut line, &mut column);
            let span = Span::new(range.start, range.end, line, column);

            match token_result {
                Ok(logos_token) => {
                    let token = convert_token(logos_token);
                    match token {
                        Token::LeftParen | Token::LeftBracket => depth += 1,
                        Token::RightParen | Token::RightBracket => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    if !(token == Token::Newline && depth > 0) {
                        self.tokens.push((token, span));
                    }
                }
                Err(()) => {
                    let slice = &self.source[range.clone()];
                    let error = if slice.starts_with('"') || slice.starts_with('\'') {
                        LexError::UnterminatedString { span }
                    } else if slice.starts_with(|c: char| c.is_ascii_digit()) {
                        LexError::InvalidNumber {
                            text: slice.to_string(),
                            span,
                        }
                    } else {
                        let char = slice.chars().next().unwrap_or('\0');
                        LexError::UnexpectedCharacter { char, span }
                    };
                    self.errors.push(error);
                }
            }

            advance(&self.source[range.start..range.end], &mut line, &mut column);
            last_end = range.end;
        }

        let eof_span = Span::new(self.source.len(), self.source.len(), line, column);
        self.tokens.push((Token::Eof, eof_span));

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }
}

fn advance(text: &str, line: &mut u32, column: &mut u32) {
    for c in text.chars() {
        if c == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    }
}

fn convert_token(logos_token: LogosToken) -> Token {
    match logos_token {
        LogosToken::Newline => Token::Newline,
        LogosToken::Import => Token::Import,
        LogosToken::From => Token::From,
        LogosToken::As => Token::As,
        LogosToken::Raise => Token::Raise,
        LogosToken::Assert => Token::Assert,
        LogosToken::Pass => Token::Pass,
        LogosToken::Del => Token::Del,
        LogosToken::Not => Token::Not,
        LogosToken::TrueKw => Token::True,
        LogosToken::FalseKw => Token::False,
        LogosToken::NoneKw => Token::None,
        LogosToken::Identifier(s) => Token::Identifier(s),
        LogosToken::IntLiteral(n) => Token::IntLiteral(n),
        LogosToken::FloatLiteral(n) => Token::FloatLiteral(n),
        LogosToken::StringLiteral(s) => Token::StringLiteral(s),
        LogosToken::EqualEqual => Token::EqualEqual,
        LogosToken::BangEqual => Token::BangEqual,
        LogosToken::Equal => Token::Equal,
        LogosToken::Plus => Token::Plus,
        LogosToken::Star => Token::Star,
        LogosToken::Dot => Token::Dot,
        LogosToken::Comma => Token::Comma,
        LogosToken::LeftParen => Token::LeftParen,
        LogosToken::RightParen => Token::RightParen,
        LogosToken::LeftBracket => Token::LeftBracket,
        LogosToken::RightBracket => Token::RightBracket,
        LogosToken::Semicolon => Token::Semicolon,
        LogosToken::Whitespace | LogosToken::Comment => {
            unreachable!("Whitespace and comments should be skipped")
        }
    }
}
