//! Live module registry.
//!
//! Every module that finished (or is in the middle of) loading is listed here
//! under its dotted name. A registry hit short-circuits resolution entirely,
//! which is why teardown has to remove injected names from it.

use rustc_hash::FxHashMap;

use crate::vm::ModuleRef;

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: FxHashMap<String, ModuleRef>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ModuleRef> {
        self.modules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, module: ModuleRef) -> Option<ModuleRef> {
        self.modules.insert(name.into(), module)
    }

    pub fn remove(&mut self, name: &str) -> Option<ModuleRef> {
        self.modules.remove(name)
    }

    /// Remove every module whose name satisfies `pred`, returning the removed
    /// names in sorted order.
    pub fn remove_matching<F>(&mut self, mut pred: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mut removed: Vec<String> = self
            .modules
            .keys()
            .filter(|name| pred(name))
            .cloned()
            .collect();
        removed.sort();
        for name in &removed {
            self.modules.remove(name);
        }
        removed
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
