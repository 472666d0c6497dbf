//! Errors raised while resolving or executing modules.

use std::fmt;

use crate::vm::ModuleName;

/// An exception raised inside the host runtime.
///
/// `kind` is the exception kind name (`ValueError`, `SyntaxError`, ...) and is
/// what diagnostics report when a load fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaisedError {
    pub kind: String,
    pub message: String,
}

impl RaisedError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn syntax(filename: &str, detail: impl fmt::Display) -> Self {
        Self::new("SyntaxError", format!("{} ({})", detail, filename))
    }

    pub fn module_not_found(name: &ModuleName) -> Self {
        Self::new("ModuleNotFoundError", format!("No module named '{}'", name))
    }

    pub fn not_a_package(name: &ModuleName, parent: &ModuleName) -> Self {
        Self::new(
            "ModuleNotFoundError",
            format!("No module named '{}'; '{}' is not a package", name, parent),
        )
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::new("ImportError", message)
    }

    pub fn name(name: &str) -> Self {
        Self::new("NameError", format!("name '{}' is not defined", name))
    }

    pub fn attribute(message: impl Into<String>) -> Self {
        Self::new("AttributeError", message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new("RuntimeError", message)
    }

    pub fn is_module_not_found(&self) -> bool {
        self.kind == "ModuleNotFoundError"
    }
}

impl fmt::Display for RaisedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for RaisedError {}
