//! Modinject runtime
//!
//! Serves modules to a [`modinject_engine::Host`] from encoded in-memory
//! bundles:
//! - **bundle**: decode, partition and collect bundles
//! - **store**: the virtual source store
//! - **resolver**: finder/loader over the store
//! - **controller**: activation and teardown
//! - **session**: process-wide init / status / finalize surface
//!
//! # Example
//!
//! ```rust,ignore
//! use modinject_runtime::Injector;
//!
//! let mut injector = Injector::default();
//! let status = injector.initialize("__SELFTEST__", "");
//! let version = injector.host_mut().import("mypkg.version")?;
//! injector.finalize();
//! ```

#![warn(rust_2018_idioms)]

pub mod bundle;
pub mod config;
pub mod controller;
pub mod error;
pub mod resolver;
pub mod session;
pub mod status;
pub mod store;

pub use bundle::{
    collect_package, decode, encode, extra_list_json, normalize_path, read_bundle_file,
    BundleDecoder, CollectError, DecodeError, PackageBundle, SourceLayout, SourceMap,
    SELFTEST_TOKEN,
};
pub use config::{ConfigError, InjectorConfig};
pub use controller::{InjectionPhase, Injector};
pub use error::{InjectError, LoadError};
pub use resolver::{materialize, Resolver, VirtualFinder};
pub use store::{SharedStore, VirtualStore};
