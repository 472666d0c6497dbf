//! The host's normal resolution path: built-in modules and site directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::vm::{
    FinderKind, Host, ModuleFinder, ModuleLoader, ModuleName, ModuleRef, ModuleSpec, RaisedError,
    Value, PACKAGE_INIT_STEM, SOURCE_EXTENSION,
};

// ============================================================================
// Site directories
// ============================================================================

/// Resolves modules from source files under a list of root directories.
///
/// For `a.b` each root is checked for `a/b.<ext>` first and then for
/// `a/b/<init>.<ext>`. Directory listings are cached until
/// [`ModuleFinder::invalidate_caches`] is called.
pub struct SiteFinder {
    roots: Vec<PathBuf>,
    extension: String,
    init_stem: String,
    listings: Mutex<FxHashMap<PathBuf, Arc<FxHashSet<String>>>>,
}

impl SiteFinder {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_layout(roots, SOURCE_EXTENSION, PACKAGE_INIT_STEM)
    }

    pub fn with_layout<I, P>(roots: I, extension: &str, init_stem: &str) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            extension: extension.to_string(),
            init_stem: init_stem.to_string(),
            listings: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn listing(&self, dir: &Path) -> Arc<FxHashSet<String>> {
        if let Some(cached) = self.listings.lock().get(dir) {
            return cached.clone();
        }

        let entries: FxHashSet<String> = match std::fs::read_dir(dir) {
            Ok(read) => read
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect(),
            Err(_) => FxHashSet::default(),
        };
        let entries = Arc::new(entries);
        self.listings
            .lock()
            .insert(dir.to_path_buf(), entries.clone());
        entries
    }

    fn locate(&self, root: &Path, name: &ModuleName) -> Option<(PathBuf, bool)> {
        let segments = name.segments();
        let mut dir = root.to_path_buf();
        for segment in &segments[..segments.len() - 1] {
            dir.push(segment);
        }

        let tail = name.tail();
        let leaf_file = format!("{}.{}", tail, self.extension);
        if self.listing(&dir).contains(&leaf_file) {
            let path = dir.join(&leaf_file);
            if path.is_file() {
                return Some((path, false));
            }
        }

        let package_dir = dir.join(tail);
        let init_file = format!("{}.{}", self.init_stem, self.extension);
        if self.listing(&package_dir).contains(&init_file) {
            let path = package_dir.join(&init_file);
            if path.is_file() {
                return Some((path, true));
            }
        }

        None
    }
}

impl ModuleFinder for SiteFinder {
    fn find_spec(
        &self,
        name: &ModuleName,
        _parent_path: Option<&[String]>,
    ) -> Result<Option<ModuleSpec>, RaisedError> {
        for root in &self.roots {
            if let Some((path, is_package)) = self.locate(root, name) {
                debug!(module = %name, path = %path.display(), "site hit");
                let origin = path.display().to_string();
                let loader = Arc::new(FileLoader::new(path));
                return Ok(Some(ModuleSpec::new(
                    name.clone(),
                    origin,
                    is_package,
                    loader,
                )));
            }
        }
        Ok(None)
    }

    fn invalidate_caches(&self) {
        self.listings.lock().clear();
    }

    fn kind(&self) -> FinderKind {
        FinderKind::Environment
    }
}

/// Executes a module body read from disk.
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModuleLoader for FileLoader {
    fn exec_module(&self, host: &mut Host, module: &ModuleRef) -> Result<(), RaisedError> {
        let source = std::fs::read_to_string(&self.path).map_err(|e| {
            RaisedError::new(
                "OSError",
                format!("cannot read '{}': {}", self.path.display(), e),
            )
        })?;
        host.execute(module, &source)
    }
}

// ============================================================================
// Built-in modules
// ============================================================================

const BUILTIN_MODULES: &[&str] = &["sys"];

/// Serves modules compiled into the host.
#[derive(Debug, Default)]
pub struct BuiltinFinder;

impl ModuleFinder for BuiltinFinder {
    fn find_spec(
        &self,
        name: &ModuleName,
        _parent_path: Option<&[String]>,
    ) -> Result<Option<ModuleSpec>, RaisedError> {
        let dotted = name.as_str();
        if !BUILTIN_MODULES.contains(&dotted.as_str()) {
            return Ok(None);
        }
        Ok(Some(ModuleSpec::new(
            name.clone(),
            "<builtin>",
            false,
            Arc::new(BuiltinLoader),
        )))
    }

    fn kind(&self) -> FinderKind {
        FinderKind::Builtin
    }
}

struct BuiltinLoader;

impl ModuleLoader for BuiltinLoader {
    fn exec_module(&self, _host: &mut Host, module: &ModuleRef) -> Result<(), RaisedError> {
        match module.name().as_str().as_str() {
            "sys" => {
                module.set_attr("version", Value::Str(env!("CARGO_PKG_VERSION").to_string()));
                module.set_attr("platform", Value::Str(std::env::consts::OS.to_string()));
                Ok(())
            }
            _ => Err(RaisedError::module_not_found(module.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_leaf_and_package_lookup() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/__init__.py"), "").unwrap();
        fs::write(dir.path().join("pkg/mod.py"), "").unwrap();

        let finder = SiteFinder::new([dir.path()]);

        let pkg = finder
            .find_spec(&ModuleName::from_dotted("pkg"), None)
            .unwrap()
            .unwrap();
        assert!(pkg.is_package);
        assert!(pkg.origin.ends_with("__init__.py"));

        let leaf = finder
            .find_spec(&ModuleName::from_dotted("pkg.mod"), None)
            .unwrap()
            .unwrap();
        assert!(!leaf.is_package);

        assert!(finder
            .find_spec(&ModuleName::from_dotted("missing"), None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_listing_cache_needs_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let finder = SiteFinder::new([dir.path()]);
        let name = ModuleName::from_dotted("late");

        assert!(finder.find_spec(&name, None).unwrap().is_none());
        fs::write(dir.path().join("late.py"), "X = 1\n").unwrap();
        assert!(finder.find_spec(&name, None).unwrap().is_none());

        finder.invalidate_caches();
        assert!(finder.find_spec(&name, None).unwrap().is_some());
    }

    #[test]
    fn test_builtin_finder_serves_sys_only() {
        let finder = BuiltinFinder;
        assert!(finder
            .find_spec(&ModuleName::from_dotted("sys"), None)
            .unwrap()
            .is_some());
        assert!(finder
            .find_spec(&ModuleName::from_dotted("os"), None)
            .unwrap()
            .is_none());
    }
}
