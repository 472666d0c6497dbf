//! Abstract syntax tree for module source text.

use crate::parser::token::Span;

/// A parsed module body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// A statement with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `import a.b` / `import a.b as c`
    Import(Vec<ImportAlias>),

    /// `from <module> import x, y as z` / `from <module> import *`
    FromImport {
        module: ImportSource,
        names: FromNames,
    },

    /// `a = b = expr`
    Assign { targets: Vec<String>, value: Expr },

    /// `raise expr` or bare `raise`
    Raise(Option<Expr>),

    /// `assert test[, message]`
    Assert { test: Expr, message: Option<Expr> },

    /// `del name`
    Delete(Vec<String>),

    Pass,

    /// Expression evaluated for its side effects (docstrings, calls)
    Expr(Expr),
}

/// One `dotted.name [as alias]` clause of an `import` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportAlias {
    pub path: Vec<String>,
    pub alias: Option<String>,
}

/// The module named after `from`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSource {
    /// Number of leading dots; zero for an absolute import.
    pub level: usize,
    pub path: Vec<String>,
}

impl ImportSource {
    pub fn is_relative(&self) -> bool {
        self.level > 0
    }
}

/// The names list of a `from` import.
#[derive(Debug, Clone, PartialEq)]
pub enum FromNames {
    Star,
    Names(Vec<(String, Option<String>)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    Name(String),
    List(Vec<Expr>),
    Attribute(Box<Expr>, String),
    Subscript(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Eq,
    NotEq,
}
