//! Module objects and module specs.
//!
//! A [`ModuleSpec`] is what a finder hands back: the module's name, where its
//! source came from, whether it is a package, and which loader executes it.
//! A [`Module`] is created from a spec before its body runs, so its identity
//! attributes (`__name__`, `__file__`, `__package__`, `__path__`) are already
//! in place while the body executes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::vm::{ModuleLoader, ModuleName, Value};

/// Shared handle to a live module.
pub type ModuleRef = Arc<Module>;

/// Descriptor produced by a finder for a module it can supply.
#[derive(Clone)]
pub struct ModuleSpec {
    pub name: ModuleName,
    /// Location identifier reported as `__file__` (a virtual or real path)
    pub origin: String,
    pub is_package: bool,
    pub loader: Arc<dyn ModuleLoader>,
}

impl ModuleSpec {
    pub fn new(
        name: ModuleName,
        origin: impl Into<String>,
        is_package: bool,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self {
            name,
            origin: origin.into(),
            is_package,
            loader,
        }
    }
}

impl fmt::Debug for ModuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSpec")
            .field("name", &self.name.as_str())
            .field("origin", &self.origin)
            .field("is_package", &self.is_package)
            .finish_non_exhaustive()
    }
}

/// A live module: fixed identity plus a mutable attribute namespace.
pub struct Module {
    name: ModuleName,
    origin: String,
    /// `__package__`: own name for packages, parent prefix for leaves
    package: String,
    /// `__path__`: present only for packages
    search_path: Option<Vec<String>>,
    attrs: RwLock<BTreeMap<String, Value>>,
}

impl Module {
    /// Create the module a spec describes.
    ///
    /// Packages get their own dotted name as a search path placeholder so
    /// child imports are allowed to proceed through the resolution chain.
    pub fn from_spec(spec: &ModuleSpec) -> Self {
        let (package, search_path) = if spec.is_package {
            (spec.name.as_str(), Some(vec![spec.name.as_str()]))
        } else {
            let parent = spec.name.parent().map(|p| p.as_str()).unwrap_or_default();
            (parent, None)
        };

        Self {
            name: spec.name.clone(),
            origin: spec.origin.clone(),
            package,
            search_path,
            attrs: RwLock::new(BTreeMap::new()),
        }
    }

    /// A module that is never registered, used for inline snippets.
    pub fn detached(name: ModuleName, origin: &str) -> Self {
        Self {
            name,
            origin: origin.to_string(),
            package: String::new(),
            search_path: None,
            attrs: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// `__package__`; empty for top-level leaf modules.
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn search_path(&self) -> Option<&[String]> {
        self.search_path.as_deref()
    }

    pub fn is_package(&self) -> bool {
        self.search_path.is_some()
    }

    /// Look up an attribute, falling back to the identity dunders.
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.attrs.read().get(name) {
            return Some(value.clone());
        }
        match name {
            "__name__" => Some(Value::Str(self.name.as_str())),
            "__file__" => Some(Value::Str(self.origin.clone())),
            "__package__" => Some(Value::Str(self.package.clone())),
            "__path__" => self
                .search_path
                .as_ref()
                .map(|p| Value::List(p.iter().cloned().map(Value::Str).collect())),
            _ => None,
        }
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_some()
    }

    pub fn set_attr(&self, name: impl Into<String>, value: Value) {
        self.attrs.write().insert(name.into(), value);
    }

    pub fn del_attr(&self, name: &str) -> Option<Value> {
        self.attrs.write().remove(name)
    }

    /// Attributes exported by `from module import *`.
    ///
    /// Honors a list-of-strings `__all__`; otherwise every name not starting
    /// with an underscore.
    pub fn public_attrs(&self) -> Vec<(String, Value)> {
        let attrs = self.attrs.read();
        if let Some(Value::List(names)) = attrs.get("__all__") {
            return names
                .iter()
                .filter_map(|n| n.as_str())
                .filter_map(|n| attrs.get(n).map(|v| (n.to_string(), v.clone())))
                .collect();
        }
        attrs
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn attr_names(&self) -> Vec<String> {
        self.attrs.read().keys().cloned().collect()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name.as_str())
            .field("origin", &self.origin)
            .field("package", &self.package)
            .field("is_package", &self.is_package())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{Host, RaisedError};

    struct NoopLoader;

    impl ModuleLoader for NoopLoader {
        fn exec_module(&self, _host: &mut Host, _module: &ModuleRef) -> Result<(), RaisedError> {
            Ok(())
        }
    }

    fn spec(name: &str, is_package: bool) -> ModuleSpec {
        ModuleSpec::new(
            ModuleName::from_dotted(name),
            format!("{}.py", name.replace('.', "/")),
            is_package,
            Arc::new(NoopLoader),
        )
    }

    #[test]
    fn test_package_identity() {
        let module = Module::from_spec(&spec("pkg.sub", true));
        assert!(module.is_package());
        assert_eq!(module.package(), "pkg.sub");
        assert_eq!(module.search_path(), Some(&["pkg.sub".to_string()][..]));
        assert_eq!(module.get_attr("__name__"), Some(Value::Str("pkg.sub".into())));
    }

    #[test]
    fn test_leaf_identity() {
        let module = Module::from_spec(&spec("pkg.sub.leaf", false));
        assert!(!module.is_package());
        assert_eq!(module.package(), "pkg.sub");
        assert!(module.get_attr("__path__").is_none());

        let top = Module::from_spec(&spec("single", false));
        assert_eq!(top.package(), "");
    }

    #[test]
    fn test_public_attrs_respects_all() {
        let module = Module::from_spec(&spec("m", false));
        module.set_attr("a", Value::Int(1));
        module.set_attr("b", Value::Int(2));
        module.set_attr("_hidden", Value::Int(3));
        assert_eq!(module.public_attrs().len(), 2);

        module.set_attr("__all__", Value::List(vec![Value::Str("b".into())]));
        let exported = module.public_attrs();
        assert_eq!(exported, vec![("b".to_string(), Value::Int(2))]);
    }
}
