//! The host runtime: live registry, resolution chain and executor.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::vm::interpreter::default_executor;
use crate::vm::{
    BuiltinFinder, FinderRef, Module, ModuleFinder, ModuleName, ModuleRef, ModuleRegistry,
    ModuleSpec, RaisedError, ResolutionChain, SiteFinder, SourceExecutor, Value,
};

/// File extension of module source files, without the dot.
pub const SOURCE_EXTENSION: &str = "py";

/// File stem that marks a directory as a package.
pub const PACKAGE_INIT_STEM: &str = "__init__";

/// Owns every live module and decides how names turn into modules.
pub struct Host {
    modules: ModuleRegistry,
    chain: ResolutionChain,
    executor: Arc<dyn SourceExecutor>,
    /// Modules whose bodies are currently executing, outermost first
    loading: Vec<String>,
}

impl Host {
    /// A host that can only resolve built-in modules.
    pub fn new() -> Self {
        Self::with_executor(default_executor())
    }

    /// A host that also resolves modules from the given site directories.
    pub fn with_site_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut host = Self::new();
        let roots: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if !roots.is_empty() {
            host.chain.push(Arc::new(SiteFinder::new(roots)));
        }
        host
    }

    pub fn with_executor(executor: Arc<dyn SourceExecutor>) -> Self {
        let mut chain = ResolutionChain::new();
        chain.push(Arc::new(BuiltinFinder));
        Self {
            modules: ModuleRegistry::new(),
            chain,
            executor,
            loading: Vec::new(),
        }
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.modules
    }

    pub fn chain(&self) -> &ResolutionChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut ResolutionChain {
        &mut self.chain
    }

    pub fn add_finder(&mut self, finder: FinderRef) {
        self.chain.push(finder);
    }

    /// Import a module by dotted name.
    pub fn import(&mut self, dotted: &str) -> Result<ModuleRef, RaisedError> {
        let name = ModuleName::parse(dotted).ok_or_else(|| {
            RaisedError::new("ValueError", format!("invalid module name '{}'", dotted))
        })?;
        self.import_name(&name)
    }

    /// Import `name`, importing its parent packages first.
    ///
    /// A registered module is returned as is. Otherwise the first finder in
    /// the chain that produces a spec wins. The new module is registered
    /// before its body runs and unregistered if the body fails.
    pub fn import_name(&mut self, name: &ModuleName) -> Result<ModuleRef, RaisedError> {
        let key = name.as_str();
        if let Some(module) = self.modules.get(&key) {
            return Ok(module);
        }

        let parent_path = match name.parent() {
            Some(parent) => {
                let parent_module = self.import_name(&parent)?;
                // The parent's body may have imported us already.
                if let Some(module) = self.modules.get(&key) {
                    return Ok(module);
                }
                match parent_module.search_path() {
                    Some(path) => Some(path.to_vec()),
                    None => return Err(RaisedError::not_a_package(name, &parent)),
                }
            }
            None => None,
        };

        let spec = self
            .find_spec(name, parent_path.as_deref())?
            .ok_or_else(|| RaisedError::module_not_found(name))?;
        let module = self.load(spec)?;

        if let Some(parent) = name.parent() {
            if let Some(parent_module) = self.modules.get(&parent.as_str()) {
                parent_module.set_attr(name.tail(), Value::Module(module.clone()));
            }
        }
        Ok(module)
    }

    /// Ask every finder in chain order; the first spec wins.
    pub fn find_spec(
        &self,
        name: &ModuleName,
        parent_path: Option<&[String]>,
    ) -> Result<Option<ModuleSpec>, RaisedError> {
        self.find_spec_with(name, parent_path, |_| true)
    }

    /// Like [`Host::find_spec`], restricted to finders `filter` accepts.
    /// Nothing is loaded.
    pub fn find_spec_with<F>(
        &self,
        name: &ModuleName,
        parent_path: Option<&[String]>,
        filter: F,
    ) -> Result<Option<ModuleSpec>, RaisedError>
    where
        F: Fn(&dyn ModuleFinder) -> bool,
    {
        for finder in self.chain.snapshot() {
            if !filter(finder.as_ref()) {
                continue;
            }
            if let Some(spec) = finder.find_spec(name, parent_path)? {
                trace!(module = %name, finder = %finder.kind(), "resolved");
                return Ok(Some(spec));
            }
        }
        Ok(None)
    }

    /// Create, register and execute the module `spec` describes.
    pub fn load(&mut self, spec: ModuleSpec) -> Result<ModuleRef, RaisedError> {
        let module = Arc::new(Module::from_spec(&spec));
        let key = spec.name.as_str();
        self.modules.insert(key.clone(), module.clone());

        debug!(module = %key, origin = %spec.origin, package = spec.is_package, "executing");
        self.loading.push(key.clone());
        let result = spec.loader.exec_module(self, &module);
        self.loading.pop();

        if let Err(err) = result {
            self.modules.remove(&key);
            return Err(err);
        }
        Ok(module)
    }

    /// Names of modules whose bodies are executing right now.
    pub fn loading(&self) -> &[String] {
        &self.loading
    }

    /// Unregister `package` and every module below it.
    ///
    /// Refuses while any of those modules is still executing. Returns the
    /// removed names, sorted.
    pub fn unload_tree(&mut self, package: &str) -> Result<Vec<String>, RaisedError> {
        let prefix = format!("{}.", package);
        let in_tree = |name: &str| name == package || name.starts_with(&prefix);

        if let Some(busy) = self.loading.iter().find(|name| in_tree(name.as_str())) {
            return Err(RaisedError::runtime(format!(
                "cannot unload '{}' while '{}' is executing",
                package, busy
            )));
        }
        Ok(self.modules.remove_matching(in_tree))
    }

    /// Run `source` as the body of `module`.
    pub fn execute(&mut self, module: &ModuleRef, source: &str) -> Result<(), RaisedError> {
        let executor = self.executor.clone();
        executor.execute(self, module, source)
    }

    /// Run `source` in a fresh, unregistered `__snippet__` module.
    pub fn run_snippet(&mut self, source: &str) -> Result<ModuleRef, RaisedError> {
        let name = ModuleName::from_dotted("__snippet__");
        let module = Arc::new(Module::detached(name, "<snippet>"));
        self.execute(&module, source)?;
        Ok(module)
    }

    pub fn invalidate_caches(&self) {
        for finder in self.chain.snapshot() {
            finder.invalidate_caches();
        }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}
