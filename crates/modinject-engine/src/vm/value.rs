//! Runtime values of the module language.

use std::fmt;
use std::sync::Arc;

use crate::vm::{ModuleRef, RaisedError};

/// Native functions available to every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Str,
    Repr,
    Len,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "print" => Some(Builtin::Print),
            "str" => Some(Builtin::Str),
            "repr" => Some(Builtin::Repr),
            "len" => Some(Builtin::Len),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Len => "len",
        }
    }
}

/// Exception kinds every module can name without defining them.
pub const BUILTIN_EXCEPTIONS: &[&str] = &[
    "Exception",
    "RuntimeError",
    "ValueError",
    "TypeError",
    "KeyError",
    "IndexError",
    "ImportError",
    "ModuleNotFoundError",
    "AttributeError",
    "NameError",
    "AssertionError",
    "NotImplementedError",
    "OverflowError",
];

/// Whether `name` denotes an exception kind: a builtin one, or any name
/// ending in `Error`/`Exception`.
pub fn is_exception_kind(name: &str) -> bool {
    BUILTIN_EXCEPTIONS.contains(&name) || name.ends_with("Error") || name.ends_with("Exception")
}

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Module(ModuleRef),
    Builtin(Builtin),
    ExceptionType(String),
    Exception(RaisedError),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Module(_) => "module",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::ExceptionType(_) => "type",
            Value::Exception(_) => "exception",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            _ => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleRef> {
        match self {
            Value::Module(m) => Some(m),
            _ => None,
        }
    }

    /// Developer-facing form: strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{:.1}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Module(m) => write!(f, "<module '{}' from '{}'>", m.name(), m.origin()),
            Value::Builtin(b) => write!(f, "<built-in function {}>", b.name()),
            Value::ExceptionType(kind) => write!(f, "<class '{}'>", kind),
            Value::Exception(err) => write!(f, "{}", err.message),
        }
    }
}
