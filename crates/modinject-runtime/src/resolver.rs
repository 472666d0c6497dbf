//! Resolver/loader serving modules out of the virtual store.

use std::sync::Arc;

use modinject_engine::{
    FinderKind, FinderRef, Host, ModuleFinder, ModuleLoader, ModuleName, ModuleRef, ModuleSpec,
    RaisedError,
};
use tracing::{debug, trace};

use crate::bundle::SourceLayout;
use crate::error::LoadError;
use crate::store::SharedStore;

/// Finder over the virtual store.
///
/// For `a.b` it checks `a/b.<ext>` first and then `a/b/<init>.<ext>`. If
/// both exist the leaf wins. Names the store does not hold are declined
/// silently so later finders get their turn.
pub struct VirtualFinder {
    store: SharedStore,
    layout: SourceLayout,
}

impl VirtualFinder {
    pub fn new(store: SharedStore, layout: SourceLayout) -> Self {
        Self { store, layout }
    }
}

impl ModuleFinder for VirtualFinder {
    fn find_spec(
        &self,
        name: &ModuleName,
        _parent_path: Option<&[String]>,
    ) -> Result<Option<ModuleSpec>, RaisedError> {
        let leaf = self.layout.leaf_path(name);
        let package = self.layout.package_path(name);

        let store = self.store.read();
        let (origin, is_package) = if store.contains(&leaf) {
            (leaf, false)
        } else if store.contains(&package) {
            (package, true)
        } else {
            trace!(module = %name, "not in store");
            return Ok(None);
        };
        drop(store);

        debug!(module = %name, origin = %origin, package = is_package, "store hit");
        let loader = Arc::new(VirtualLoader {
            store: self.store.clone(),
            path: origin.clone(),
        });
        Ok(Some(ModuleSpec::new(name.clone(), origin, is_package, loader)))
    }

    fn kind(&self) -> FinderKind {
        FinderKind::Injected
    }
}

/// Executes one stored source file.
struct VirtualLoader {
    store: SharedStore,
    path: String,
}

impl ModuleLoader for VirtualLoader {
    fn exec_module(&self, host: &mut Host, module: &ModuleRef) -> Result<(), RaisedError> {
        // Release the store before executing: the body may import siblings.
        let source = self.store.read().get(&self.path).map(str::to_string);
        let source = source.ok_or_else(|| {
            RaisedError::import(format!("Module source not found for {}", module.name()))
        })?;
        host.execute(module, &source)
    }
}

/// Owns the single resolver instance an injector may have in the chain.
pub struct Resolver {
    store: SharedStore,
    layout: SourceLayout,
    active: Option<FinderRef>,
}

impl Resolver {
    pub fn new(store: SharedStore, layout: SourceLayout) -> Self {
        Self {
            store,
            layout,
            active: None,
        }
    }

    /// Put the resolver at the front of `host`'s chain unless it is already
    /// there. Returns whether anything changed.
    pub fn install(&mut self, host: &mut Host) -> bool {
        if let Some(finder) = &self.active {
            if host.chain().contains(finder) {
                return false;
            }
        }

        let finder: FinderRef = match &self.active {
            Some(finder) => finder.clone(),
            None => Arc::new(VirtualFinder::new(self.store.clone(), self.layout.clone())),
        };
        host.chain_mut().insert_front(finder.clone());
        self.active = Some(finder);
        debug!("resolver installed");
        true
    }

    /// Remove the resolver from `host`'s chain. A no-op when not installed.
    pub fn uninstall(&mut self, host: &mut Host) -> bool {
        match self.active.take() {
            Some(finder) => {
                let removed = host.chain_mut().remove(&finder);
                debug!(removed, "resolver uninstalled");
                removed
            }
            None => false,
        }
    }

    pub fn is_installed(&self, host: &Host) -> bool {
        self.active
            .as_ref()
            .is_some_and(|finder| host.chain().contains(finder))
    }

    pub fn finder(&self) -> Option<&FinderRef> {
        self.active.as_ref()
    }
}

/// Import `name` through the host, reporting failures against that name.
pub fn materialize(host: &mut Host, name: &str) -> Result<ModuleRef, LoadError> {
    host.import(name).map_err(|source| LoadError::new(name, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::PackageBundle;
    use crate::store::VirtualStore;

    fn store_with(entries: &[(&str, &str)]) -> SharedStore {
        let store = VirtualStore::shared();
        let mut bundle = PackageBundle::new("test");
        for (path, text) in entries {
            bundle.entries.insert(path.to_string(), text.to_string());
        }
        store.write().merge(&bundle);
        store
    }

    #[test]
    fn test_install_is_idempotent() {
        let mut host = Host::new();
        let mut resolver = Resolver::new(VirtualStore::shared(), SourceLayout::default());

        assert!(resolver.install(&mut host));
        assert!(!resolver.install(&mut host));
        assert_eq!(host.chain().count_kind(FinderKind::Injected), 1);
        assert_eq!(host.chain().kinds()[0], FinderKind::Injected);
    }

    #[test]
    fn test_uninstall_without_install() {
        let mut host = Host::new();
        let mut resolver = Resolver::new(VirtualStore::shared(), SourceLayout::default());
        assert!(!resolver.uninstall(&mut host));
        assert_eq!(host.chain().len(), 1);
    }

    #[test]
    fn test_reinstalls_after_external_removal() {
        let mut host = Host::new();
        let mut resolver = Resolver::new(VirtualStore::shared(), SourceLayout::default());
        resolver.install(&mut host);
        let finder = resolver.finder().cloned().unwrap();
        host.chain_mut().remove(&finder);

        assert!(!resolver.is_installed(&host));
        assert!(resolver.install(&mut host));
        assert!(host.chain().contains(&finder));
    }

    #[test]
    fn test_finder_declines_unknown_names() {
        let finder = VirtualFinder::new(store_with(&[("a.py", "")]), SourceLayout::default());
        let spec = finder
            .find_spec(&ModuleName::parse("b").unwrap(), None)
            .unwrap();
        assert!(spec.is_none());
    }

    #[test]
    fn test_entries_merged_after_install_are_visible() {
        let store = VirtualStore::shared();
        let mut host = Host::new();
        let mut resolver = Resolver::new(store.clone(), SourceLayout::default());
        resolver.install(&mut host);

        store.write().merge(&{
            let mut bundle = PackageBundle::new("late");
            bundle
                .entries
                .insert("late.py".to_string(), "READY = True\n".to_string());
            bundle
        });

        let module = materialize(&mut host, "late").unwrap();
        assert!(module.get_attr("READY").is_some());
        assert_eq!(module.origin(), "late.py");
    }

    #[test]
    fn test_materialize_failure_names_module() {
        let store = store_with(&[("bad/__init__.py", "raise ValueError('nope')\n")]);
        let mut host = Host::new();
        let mut resolver = Resolver::new(store.clone(), SourceLayout::default());
        resolver.install(&mut host);

        let err = materialize(&mut host, "bad").unwrap_err();
        assert_eq!(err.name, "bad");
        assert_eq!(err.kind(), "ValueError");
        assert_eq!(store.read().len(), 1);
        assert!(!host.modules().contains("bad"));
    }
}
