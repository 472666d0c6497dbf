//! Bundles: encoded maps of virtual path -> module source
//!
//! - **codec**: base64(gzip(JSON)) decoding and encoding, self-test map
//! - **partition**: grouping by top-level package and classification
//! - **collect**: building maps from disk, reading bundle files

pub mod codec;
pub mod collect;
pub mod partition;

use std::collections::BTreeMap;

use modinject_engine::{ModuleName, PACKAGE_INIT_STEM, SOURCE_EXTENSION};

pub use codec::{decode, encode, selftest_map, BundleDecoder, DecodeError, SELFTEST_TOKEN};
pub use collect::{collect_package, extra_list_json, read_bundle_file, CollectError};
pub use partition::{
    classify, partition, plan, top_level_name, Classification, InjectionPlan, PackageBundle,
};

/// Flat mapping of virtual path to source text, ordered by path.
pub type SourceMap = BTreeMap<String, String>;

/// Normalize a virtual path: forward slashes, no leading `./`.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut trimmed = path.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

/// How dotted module names map onto virtual file paths.
///
/// `a.b` is the leaf file `a/b.<extension>` or the package root
/// `a/b/<init_stem>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub extension: String,
    pub init_stem: String,
}

impl SourceLayout {
    pub fn new(extension: impl Into<String>, init_stem: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            init_stem: init_stem.into(),
        }
    }

    /// `a/b.<ext>`
    pub fn leaf_path(&self, name: &ModuleName) -> String {
        format!("{}.{}", name.to_path(), self.extension)
    }

    /// `a/b/<init>.<ext>`
    pub fn package_path(&self, name: &ModuleName) -> String {
        format!("{}/{}.{}", name.to_path(), self.init_stem, self.extension)
    }

    /// `.ext`
    pub fn suffix(&self) -> String {
        format!(".{}", self.extension)
    }
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self::new(SOURCE_EXTENSION, PACKAGE_INIT_STEM)
    }
}
