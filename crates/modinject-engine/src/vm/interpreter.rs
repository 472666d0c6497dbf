//! Tree-walking executor for module bodies.
//!
//! Every statement runs against the executing module's namespace; there are
//! no function scopes. Imports re-enter [`Host::import_name`], so executing a
//! package body can load its children before the body finishes.

use std::sync::Arc;

use crate::parser::ast::{BinaryOp, Expr, FromNames, ImportAlias, ImportSource, Statement, StmtKind};
use crate::parser::parse_program;
use crate::vm::{is_exception_kind, Builtin, Host, ModuleName, ModuleRef, RaisedError, Value};

/// Runs source text as the body of a module.
///
/// The host funnels every module execution through one of these, so an
/// alternative strategy only has to implement this trait.
pub trait SourceExecutor: Send + Sync {
    fn execute(&self, host: &mut Host, module: &ModuleRef, source: &str)
        -> Result<(), RaisedError>;
}

/// The default executor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Interpreter;

impl SourceExecutor for Interpreter {
    fn execute(
        &self,
        host: &mut Host,
        module: &ModuleRef,
        source: &str,
    ) -> Result<(), RaisedError> {
        let program = parse_program(source, module.origin())?;
        let mut frame = Frame { host, module };
        for statement in &program.statements {
            frame.exec(statement)?;
        }
        Ok(())
    }
}

/// Execution state for one module body.
struct Frame<'a> {
    host: &'a mut Host,
    module: &'a ModuleRef,
}

impl Frame<'_> {
    fn exec(&mut self, statement: &Statement) -> Result<(), RaisedError> {
        match &statement.kind {
            StmtKind::Import(aliases) => {
                for alias in aliases {
                    self.exec_import(alias)?;
                }
                Ok(())
            }
            StmtKind::FromImport { module, names } => self.exec_from_import(module, names),
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.module.set_attr(target.clone(), value.clone());
                }
                Ok(())
            }
            StmtKind::Raise(Some(expr)) => Err(raise_value(self.eval(expr)?)),
            StmtKind::Raise(None) => Err(RaisedError::runtime("No active exception to reraise")),
            StmtKind::Assert { test, message } => {
                if self.eval(test)?.is_truthy() {
                    return Ok(());
                }
                let message = match message {
                    Some(expr) => self.eval(expr)?.to_string(),
                    None => String::new(),
                };
                Err(RaisedError::new("AssertionError", message))
            }
            StmtKind::Delete(names) => {
                for name in names {
                    if self.module.del_attr(name).is_none() {
                        return Err(RaisedError::name(name));
                    }
                }
                Ok(())
            }
            StmtKind::Pass => Ok(()),
            StmtKind::Expr(expr) => self.eval(expr).map(|_| ()),
        }
    }

    /// `import a.b.c` binds `a`; `import a.b.c as x` binds the leaf.
    fn exec_import(&mut self, alias: &ImportAlias) -> Result<(), RaisedError> {
        let name = segments_name(&alias.path)?;
        let leaf = self.host.import_name(&name)?;

        match &alias.alias {
            Some(bound) => self.module.set_attr(bound.clone(), Value::Module(leaf)),
            None => {
                let head = self
                    .host
                    .modules()
                    .get(name.head())
                    .ok_or_else(|| RaisedError::module_not_found(&name))?;
                self.module.set_attr(name.head(), Value::Module(head));
            }
        }
        Ok(())
    }

    fn exec_from_import(
        &mut self,
        source: &ImportSource,
        names: &FromNames,
    ) -> Result<(), RaisedError> {
        let target = self.resolve_source(source)?;
        let imported = self.host.import_name(&target)?;

        match names {
            FromNames::Star => {
                for (name, value) in imported.public_attrs() {
                    self.module.set_attr(name, value);
                }
            }
            FromNames::Names(names) => {
                for (name, alias) in names {
                    let value = self.import_member(&target, &imported, name)?;
                    let bound = alias.as_ref().unwrap_or(name);
                    self.module.set_attr(bound.clone(), value);
                }
            }
        }
        Ok(())
    }

    /// Absolute name of the module a `from` statement refers to.
    fn resolve_source(&self, source: &ImportSource) -> Result<ModuleName, RaisedError> {
        if !source.is_relative() {
            return segments_name(&source.path);
        }

        let package = ModuleName::parse(self.module.package()).ok_or_else(|| {
            RaisedError::import("attempted relative import with no known parent package")
        })?;
        let base = package.strip_last(source.level - 1).ok_or_else(|| {
            RaisedError::import("attempted relative import beyond top-level package")
        })?;
        Ok(base.join(&source.path))
    }

    /// An attribute of `imported`, or failing that its submodule `name`.
    fn import_member(
        &mut self,
        target: &ModuleName,
        imported: &ModuleRef,
        name: &str,
    ) -> Result<Value, RaisedError> {
        if let Some(value) = imported.get_attr(name) {
            return Ok(value);
        }

        let cannot_import = || {
            RaisedError::import(format!(
                "cannot import name '{}' from '{}' ({})",
                name,
                target,
                imported.origin()
            ))
        };

        if !imported.is_package() {
            return Err(cannot_import());
        }

        let child = target.join([name]);
        match self.host.import_name(&child) {
            Ok(module) => Ok(Value::Module(module)),
            Err(err) if err == RaisedError::module_not_found(&child) => Err(cannot_import()),
            Err(err) => Err(err),
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, RaisedError> {
        if let Some(value) = self.module.get_attr(name) {
            return Ok(value);
        }
        if let Some(builtin) = Builtin::lookup(name) {
            return Ok(Value::Builtin(builtin));
        }
        if is_exception_kind(name) {
            return Ok(Value::ExceptionType(name.to_string()));
        }
        Err(RaisedError::name(name))
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, RaisedError> {
        match expr {
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::None => Ok(Value::None),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Attribute(object, attr) => {
                let object = self.eval(object)?;
                get_attribute(&object, attr)
            }
            Expr::Subscript(object, index) => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                subscript(&object, &index)
            }
            Expr::Call(callee, args) => {
                let callee = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                call(&callee, args)
            }
            Expr::Binary(lhs, op, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs)
            }
            Expr::Not(operand) => Ok(Value::Bool(!self.eval(operand)?.is_truthy())),
        }
    }
}

fn segments_name(segments: &[String]) -> Result<ModuleName, RaisedError> {
    ModuleName::from_segments(segments).ok_or_else(|| {
        RaisedError::new(
            "ValueError",
            format!("invalid module name '{}'", segments.join(".")),
        )
    })
}

fn raise_value(value: Value) -> RaisedError {
    match value {
        Value::ExceptionType(kind) => RaisedError::new(kind, ""),
        Value::Exception(err) => err,
        other => RaisedError::type_error(format!(
            "exceptions must derive from BaseException, not '{}'",
            other.type_name()
        )),
    }
}

fn get_attribute(object: &Value, attr: &str) -> Result<Value, RaisedError> {
    match object {
        Value::Module(module) => module.get_attr(attr).ok_or_else(|| {
            RaisedError::attribute(format!(
                "module '{}' has no attribute '{}'",
                module.name(),
                attr
            ))
        }),
        Value::Exception(err) if attr == "args" => Ok(Value::List(vec![Value::Str(
            err.message.clone(),
        )])),
        other => Err(RaisedError::attribute(format!(
            "'{}' object has no attribute '{}'",
            other.type_name(),
            attr
        ))),
    }
}

fn subscript(object: &Value, index: &Value) -> Result<Value, RaisedError> {
    let Value::Int(raw) = index else {
        return Err(RaisedError::type_error(format!(
            "{} indices must be integers, not {}",
            object.type_name(),
            index.type_name()
        )));
    };

    match object {
        Value::List(items) => normalize_index(*raw, items.len())
            .map(|i| items[i].clone())
            .ok_or_else(|| RaisedError::new("IndexError", "list index out of range")),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            normalize_index(*raw, chars.len())
                .map(|i| Value::Str(chars[i].to_string()))
                .ok_or_else(|| RaisedError::new("IndexError", "string index out of range"))
        }
        other => Err(RaisedError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn normalize_index(raw: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if raw < 0 { raw + len } else { raw };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn call(callee: &Value, args: Vec<Value>) -> Result<Value, RaisedError> {
    match callee {
        Value::Builtin(builtin) => call_builtin(*builtin, args),
        Value::ExceptionType(kind) => {
            let message = match args.as_slice() {
                [] => String::new(),
                [single] => single.to_string(),
                many => {
                    let parts: Vec<String> = many.iter().map(Value::repr).collect();
                    format!("({})", parts.join(", "))
                }
            };
            Ok(Value::Exception(RaisedError::new(kind.clone(), message)))
        }
        other => Err(RaisedError::type_error(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

fn call_builtin(builtin: Builtin, args: Vec<Value>) -> Result<Value, RaisedError> {
    match builtin {
        Builtin::Print => {
            let parts: Vec<String> = args.iter().map(Value::to_string).collect();
            println!("{}", parts.join(" "));
            Ok(Value::None)
        }
        Builtin::Str => match args.as_slice() {
            [] => Ok(Value::Str(String::new())),
            [value] => Ok(Value::Str(value.to_string())),
            _ => Err(arity(builtin, "at most 1 argument", args.len())),
        },
        Builtin::Repr => match args.as_slice() {
            [value] => Ok(Value::Str(value.repr())),
            _ => Err(arity(builtin, "exactly one argument", args.len())),
        },
        Builtin::Len => match args.as_slice() {
            [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
            [Value::List(items)] => Ok(Value::Int(items.len() as i64)),
            [other] => Err(RaisedError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            ))),
            _ => Err(arity(builtin, "exactly one argument", args.len())),
        },
    }
}

fn arity(builtin: Builtin, expected: &str, given: usize) -> RaisedError {
    RaisedError::type_error(format!(
        "{}() takes {} ({} given)",
        builtin.name(),
        expected,
        given
    ))
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RaisedError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::NotEq => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(b)
                .map(Value::Int)
                .ok_or_else(|| RaisedError::new("OverflowError", "integer addition overflowed")),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                Ok(Value::Float(a as f64 + b))
            }
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (a, b) => Err(RaisedError::type_error(format!(
                "unsupported operand type(s) for +: '{}' and '{}'",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

/// The executor a [`Host`] uses unless told otherwise.
pub fn default_executor() -> Arc<dyn SourceExecutor> {
    Arc::new(Interpreter)
}
