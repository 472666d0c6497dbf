//! Finder and loader seams, and the ordered resolution chain.
//!
//! Resolution asks each finder in chain order for a [`ModuleSpec`]; the first
//! finder that returns one wins. Finders are shared `Arc`s so the injection
//! subsystem can hold on to the exact instance it inserted and later remove
//! it by identity.

use std::fmt;
use std::sync::Arc;

use crate::vm::{Host, ModuleName, ModuleRef, ModuleSpec, RaisedError};

/// Where a finder's modules come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinderKind {
    /// Modules compiled into the host
    Builtin,
    /// Modules installed in the host environment (site directories)
    Environment,
    /// Modules served from an in-memory bundle
    Injected,
}

impl fmt::Display for FinderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinderKind::Builtin => write!(f, "builtin"),
            FinderKind::Environment => write!(f, "environment"),
            FinderKind::Injected => write!(f, "injected"),
        }
    }
}

/// Locates modules by dotted name.
pub trait ModuleFinder: Send + Sync {
    /// Produce a spec for `name`, or `Ok(None)` to let later finders try.
    ///
    /// `parent_path` is the parent package's `__path__` for submodules and
    /// `None` for top-level names.
    fn find_spec(
        &self,
        name: &ModuleName,
        parent_path: Option<&[String]>,
    ) -> Result<Option<ModuleSpec>, RaisedError>;

    /// Drop any cached lookup state.
    fn invalidate_caches(&self) {}

    fn kind(&self) -> FinderKind;
}

/// Executes a module body into a freshly created module.
pub trait ModuleLoader: Send + Sync {
    fn exec_module(&self, host: &mut Host, module: &ModuleRef) -> Result<(), RaisedError>;
}

pub type FinderRef = Arc<dyn ModuleFinder>;

fn same_finder(a: &FinderRef, b: &FinderRef) -> bool {
    // Compare data pointers only; vtable pointers may differ across codegen units.
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Ordered list of finders consulted on every import.
#[derive(Default, Clone)]
pub struct ResolutionChain {
    finders: Vec<FinderRef>,
}

impl ResolutionChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at highest priority.
    pub fn insert_front(&mut self, finder: FinderRef) {
        self.finders.insert(0, finder);
    }

    /// Append at lowest priority.
    pub fn push(&mut self, finder: FinderRef) {
        self.finders.push(finder);
    }

    /// Remove every occurrence of `finder`. Returns whether anything was removed.
    pub fn remove(&mut self, finder: &FinderRef) -> bool {
        let before = self.finders.len();
        self.finders.retain(|f| !same_finder(f, finder));
        self.finders.len() != before
    }

    pub fn contains(&self, finder: &FinderRef) -> bool {
        self.finders.iter().any(|f| same_finder(f, finder))
    }

    pub fn position(&self, finder: &FinderRef) -> Option<usize> {
        self.finders.iter().position(|f| same_finder(f, finder))
    }

    /// Copy of the current order, safe to iterate while the host is mutated.
    pub fn snapshot(&self) -> Vec<FinderRef> {
        self.finders.clone()
    }

    pub fn count_kind(&self, kind: FinderKind) -> usize {
        self.finders.iter().filter(|f| f.kind() == kind).count()
    }

    pub fn kinds(&self) -> Vec<FinderKind> {
        self.finders.iter().map(|f| f.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }
}

impl fmt::Debug for ResolutionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Declines(FinderKind);

    impl ModuleFinder for Declines {
        fn find_spec(
            &self,
            _name: &ModuleName,
            _parent_path: Option<&[String]>,
        ) -> Result<Option<ModuleSpec>, RaisedError> {
            Ok(None)
        }

        fn kind(&self) -> FinderKind {
            self.0
        }
    }

    #[test]
    fn test_front_insertion_and_identity_removal() {
        let env: FinderRef = Arc::new(Declines(FinderKind::Environment));
        let injected: FinderRef = Arc::new(Declines(FinderKind::Injected));
        let twin: FinderRef = Arc::new(Declines(FinderKind::Injected));

        let mut chain = ResolutionChain::new();
        chain.push(env.clone());
        chain.insert_front(injected.clone());

        assert_eq!(chain.position(&injected), Some(0));
        assert!(!chain.contains(&twin));
        assert!(!chain.remove(&twin));
        assert!(chain.remove(&injected));
        assert_eq!(chain.kinds(), vec![FinderKind::Environment]);
    }

    #[test]
    fn test_count_kind() {
        let mut chain = ResolutionChain::new();
        chain.push(Arc::new(Declines(FinderKind::Builtin)));
        chain.push(Arc::new(Declines(FinderKind::Injected)));
        chain.push(Arc::new(Declines(FinderKind::Injected)));
        assert_eq!(chain.count_kind(FinderKind::Injected), 2);
        assert_eq!(chain.count_kind(FinderKind::Environment), 0);
    }
}
