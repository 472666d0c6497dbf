//! Recursive descent parser for module source text.
//!
//! Statements are line oriented. On error the parser records the problem,
//! skips to the next statement boundary and keeps going, so one pass reports
//! every malformed line.

use crate::parser::ast::*;
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::lexer::{LexError, Lexer};
use crate::parser::token::{Span, Token};

pub struct Parser {
    /// Pre-tokenized input, always terminated by `Token::Eof`
    tokens: Vec<(Token, Span)>,

    /// Current position in token stream
    pos: usize,

    /// Accumulated parse errors
    errors: Vec<ParseError>,
}

impl Parser {
    /// Create a parser over `source`, tokenizing it up front.
    pub fn new(source: &str) -> Result<Self, Vec<LexError>> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        })
    }

    /// Parse the whole token stream into a [`Program`].
    pub fn parse(mut self) -> Result<Program, Vec<ParseError>> {
        let mut statements = Vec::new();

        loop {
            while self.current().is_terminator() && !self.at_eof() {
                self.advance();
            }
            if self.at_eof() {
                break;
            }

            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.sync_to_statement_boundary();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(self.errors)
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let span = self.current_span();
        let kind = match self.current() {
            Token::Import => self.parse_import()?,
            Token::From => self.parse_from_import()?,
            Token::Raise => {
                self.advance();
                if self.current().is_terminator() {
                    StmtKind::Raise(None)
                } else {
                    StmtKind::Raise(Some(self.parse_expr()?))
                }
            }
            Token::Assert => {
                self.advance();
                let test = self.parse_expr()?;
                let message = if self.eat(&Token::Comma) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                StmtKind::Assert { test, message }
            }
            Token::Del => {
                self.advance();
                let mut names = vec![self.expect_identifier()?];
                while self.eat(&Token::Comma) {
                    names.push(self.expect_identifier()?);
                }
                StmtKind::Delete(names)
            }
            Token::Pass => {
                self.advance();
                StmtKind::Pass
            }
            _ => self.parse_expr_or_assign()?,
        };

        self.expect_end_of_statement()?;
        Ok(Statement { kind, span })
    }

    fn parse_import(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&Token::Import, "'import'")?;
        let mut aliases = Vec::new();
        loop {
            let path = self.parse_dotted_name()?;
            let alias = if self.eat(&Token::As) {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            aliases.push(ImportAlias { path, alias });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(StmtKind::Import(aliases))
    }

    fn parse_from_import(&mut self) -> Result<StmtKind, ParseError> {
        let from_span = self.current_span();
        self.expect(&Token::From, "'from'")?;

        let mut level = 0;
        while self.eat(&Token::Dot) {
            level += 1;
        }
        let path = if matches!(self.current(), Token::Identifier(_)) {
            self.parse_dotted_name()?
        } else {
            Vec::new()
        };
        if level == 0 && path.is_empty() {
            return Err(ParseError::new(ParseErrorKind::MissingModulePath, from_span));
        }

        self.expect(&Token::Import, "'import'")?;

        let names = if self.eat(&Token::Star) {
            FromNames::Star
        } else {
            let parenthesized = self.eat(&Token::LeftParen);
            let mut names = Vec::new();
            loop {
                if parenthesized && self.current() == &Token::RightParen {
                    break;
                }
                let name = self.expect_identifier()?;
                let alias = if self.eat(&Token::As) {
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                names.push((name, alias));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            if parenthesized {
                self.expect(&Token::RightParen, "')'")?;
            }
            FromNames::Names(names)
        };

        Ok(StmtKind::FromImport {
            module: ImportSource { level, path },
            names,
        })
    }

    fn parse_expr_or_assign(&mut self) -> Result<StmtKind, ParseError> {
        let first_span = self.current_span();
        let first = self.parse_expr()?;
        if self.current() != &Token::Equal {
            return Ok(StmtKind::Expr(first));
        }

        let mut targets = vec![assignment_target(first, first_span)?];
        loop {
            self.expect(&Token::Equal, "'='")?;
            let span = self.current_span();
            let value = self.parse_expr()?;
            if self.current() == &Token::Equal {
                targets.push(assignment_target(value, span)?);
            } else {
                return Ok(StmtKind::Assign { targets, value });
            }
        }
    }

    fn parse_dotted_name(&mut self) -> Result<Vec<String>, ParseError> {
        let mut path = vec![self.expect_identifier()?];
        while self.eat(&Token::Dot) {
            path.push(self.expect_identifier()?);
        }
        Ok(path)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.parse_expr()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_sum()?;
        let op = match self.current() {
            Token::EqualEqual => BinaryOp::Eq,
            Token::BangEqual => BinaryOp::NotEq,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_sum()?;
        Ok(Expr::Binary(Box::new(left), op, Box::new(right)))
    }

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_postfix()?;
        while self.eat(&Token::Plus) {
            let right = self.parse_postfix()?;
            expr = Expr::Binary(Box::new(expr), BinaryOp::Add, Box::new(right));
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(&Token::Dot) {
                let attr = self.expect_identifier()?;
                expr = Expr::Attribute(Box::new(expr), attr);
            } else if self.eat(&Token::LeftParen) {
                let args = self.parse_sequence(&Token::RightParen, "')'")?;
                expr = Expr::Call(Box::new(expr), args);
            } else if self.eat(&Token::LeftBracket) {
                let index = self.parse_expr()?;
                self.expect(&Token::RightBracket, "']'")?;
                expr = Expr::Subscript(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        match token {
            Token::StringLiteral(s) => {
                self.advance();
                // Adjacent literals concatenate
                let mut value = s;
                while let Token::StringLiteral(next) = self.current() {
                    value.push_str(next);
                    self.advance();
                }
                Ok(Expr::Str(value))
            }
            Token::IntLiteral(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            Token::FloatLiteral(n) => {
                self.advance();
                Ok(Expr::Float(n))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Token::None => {
                self.advance();
                Ok(Expr::None)
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Expr::Name(name))
            }
            Token::LeftBracket => {
                self.advance();
                let items = self.parse_sequence(&Token::RightBracket, "']'")?;
                Ok(Expr::List(items))
            }
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RightParen, "')'")?;
                Ok(inner)
            }
            found => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    expected: "expression".to_string(),
                    found,
                },
                self.current_span(),
            )),
        }
    }

    /// Comma separated expressions up to `close`, trailing comma allowed.
    fn parse_sequence(&mut self, close: &Token, close_desc: &str) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while self.current() != close {
            items.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(close, close_desc)?;
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn advance(&mut self) {
        if !self.at_eof() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, description: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(description))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let Token::Identifier(name) = self.current() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn expect_end_of_statement(&mut self) -> Result<(), ParseError> {
        if self.current().is_terminator() {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(
                ParseErrorKind::ExpectedEndOfStatement {
                    found: self.current().clone(),
                },
                self.current_span(),
            ))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current().clone(),
            },
            self.current_span(),
        )
    }

    fn sync_to_statement_boundary(&mut self) {
        while !self.current().is_terminator() {
            self.advance();
        }
        self.advance();
    }
}

fn assignment_target(expr: Expr, span: Span) -> Result<String, ParseError> {
    match expr {
        Expr::Name(name) => Ok(name),
        _ => Err(ParseError::new(ParseErrorKind::InvalidAssignmentTarget, span)),
    }
}
