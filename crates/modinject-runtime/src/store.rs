//! Virtual Source Store
//!
//! The in-memory file table injected modules are served from. Paths are
//! normalized: forward slashes, no leading `./`.
//!
//! The store is shared between the controller, which is the only writer, and
//! the resolver, which only reads. Both hold the same [`SharedStore`], so
//! entries merged after the resolver was installed are visible to it.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bundle::{normalize_path, top_level_name, PackageBundle, SourceLayout, SourceMap};

/// Handle to the one store an injector owns.
pub type SharedStore = Arc<RwLock<VirtualStore>>;

#[derive(Debug, Clone, Default)]
pub struct VirtualStore {
    entries: SourceMap,
}

impl VirtualStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Add every entry of `bundle`; a path already present is overwritten.
    pub fn merge(&mut self, bundle: &PackageBundle) {
        for (path, text) in &bundle.entries {
            self.entries.insert(normalize_path(path), text.clone());
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(&normalize_path(path)).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Top-level packages represented in the store, sorted.
    pub fn top_level_packages(&self, layout: &SourceLayout) -> BTreeSet<String> {
        self.entries
            .keys()
            .filter_map(|path| top_level_name(path, layout))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(name: &str, entries: &[(&str, &str)]) -> PackageBundle {
        let mut bundle = PackageBundle::new(name);
        for (path, text) in entries {
            bundle.entries.insert(path.to_string(), text.to_string());
        }
        bundle
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let mut store = VirtualStore::new();
        store.merge(&bundle("a", &[("a/__init__.py", "X = 1\n")]));
        store.merge(&bundle("a", &[("a/__init__.py", "X = 2\n"), ("a/b.py", "")]));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a/__init__.py"), Some("X = 2\n"));
    }

    #[test]
    fn test_normalized_lookup() {
        let mut store = VirtualStore::new();
        store.merge(&bundle("w", &[(".\\w\\mod.py", "")]));
        assert!(store.contains("w/mod.py"));
        assert!(store.contains("./w/mod.py"));
    }

    #[test]
    fn test_top_level_packages_and_clear() {
        let mut store = VirtualStore::new();
        store.merge(&bundle("b", &[("b/__init__.py", ""), ("b/x.py", "")]));
        store.merge(&bundle("a", &[("a.py", "")]));

        let packages: Vec<String> = store
            .top_level_packages(&SourceLayout::default())
            .into_iter()
            .collect();
        assert_eq!(packages, vec!["a".to_string(), "b".to_string()]);

        store.clear();
        assert!(store.is_empty());
    }
}
