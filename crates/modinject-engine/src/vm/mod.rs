//! Module runtime
//!
//! - **module**: module objects and the specs finders produce
//! - **registry**: live name -> module table
//! - **finder**: finder/loader traits and the resolution chain
//! - **site**: built-in and on-disk finders
//! - **interpreter**: executes module bodies
//! - **host**: ties the above together behind `import`

pub mod error;
pub mod finder;
pub mod host;
pub mod interpreter;
pub mod module;
pub mod module_name;
pub mod registry;
pub mod site;
pub mod value;

pub use error::RaisedError;
pub use finder::{FinderKind, FinderRef, ModuleFinder, ModuleLoader, ResolutionChain};
pub use host::{Host, PACKAGE_INIT_STEM, SOURCE_EXTENSION};
pub use interpreter::{Interpreter, SourceExecutor};
pub use module::{Module, ModuleRef, ModuleSpec};
pub use module_name::ModuleName;
pub use registry::ModuleRegistry;
pub use site::{BuiltinFinder, FileLoader, SiteFinder};
pub use value::{is_exception_kind, Builtin, Value, BUILTIN_EXCEPTIONS};
