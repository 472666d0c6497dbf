//! Modinject host engine
//!
//! A small module-oriented scripting runtime that the injection subsystem
//! plugs into:
//! - **Parser**: logos lexer and recursive descent parser (`parser` module)
//! - **VM**: module objects, registry, resolution chain, finders and the
//!   interpreter (`vm` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use modinject_engine::Host;
//!
//! let mut host = Host::with_site_paths(["./site"]);
//! let module = host.import("mypkg.version")?;
//! println!("{}", module.get_attr("VERSION").unwrap());
//! ```

#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Parser module: lexer, AST and parser for module source text
pub mod parser;

/// VM module: registry, resolution chain and interpreter
pub mod vm;

// ============================================================================
// Re-exports
// ============================================================================

pub use parser::{parse_program, ParseError, Parser, Program};
pub use vm::{
    FinderKind, FinderRef, Host, Interpreter, Module, ModuleFinder, ModuleLoader, ModuleName,
    ModuleRef, ModuleRegistry, ModuleSpec, RaisedError, ResolutionChain, SiteFinder,
    SourceExecutor, Value, PACKAGE_INIT_STEM, SOURCE_EXTENSION,
};
