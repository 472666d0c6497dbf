//! Injection Controller
//!
//! Runs one activation end to end:
//!
//! ```text
//! Idle -> Planning -> Merged -> Validated
//!   \_________________________________\__-> TornDown (finalize)
//! ```
//!
//! Planning decodes every bundle and classifies each package; Merged has the
//! needed packages in the store with the resolver installed; Validated has
//! imported each injected package once. Every outcome, including failures,
//! ends up in the status string.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use modinject_engine::{Host, SiteFinder, Value};
use tracing::{debug, info, warn};

use crate::bundle::{plan, BundleDecoder, SourceLayout, SourceMap};
use crate::config::InjectorConfig;
use crate::error::InjectError;
use crate::resolver::{materialize, Resolver};
use crate::status::{self, ExtraBundleError, ValidationResult, Verdict};
use crate::store::{SharedStore, VirtualStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPhase {
    Idle,
    Planning,
    Merged,
    Validated,
    TornDown,
}

impl fmt::Display for InjectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InjectionPhase::Idle => "idle",
            InjectionPhase::Planning => "planning",
            InjectionPhase::Merged => "merged",
            InjectionPhase::Validated => "validated",
            InjectionPhase::TornDown => "torn-down",
        };
        f.write_str(name)
    }
}

/// Owns the host, the virtual store and the single resolver.
pub struct Injector {
    host: Host,
    config: InjectorConfig,
    layout: SourceLayout,
    decoder: BundleDecoder,
    store: SharedStore,
    resolver: Resolver,
    phase: InjectionPhase,
    status: String,
}

/// Result of the decode step.
struct Decoded {
    maps: Vec<SourceMap>,
    extra_errors: Vec<ExtraBundleError>,
}

impl Injector {
    pub fn new(host: Host, config: InjectorConfig) -> Self {
        let layout = config.layout();
        let decoder = BundleDecoder::new(&config.injector.selftest_token, layout.clone());
        let store = VirtualStore::shared();
        let resolver = Resolver::new(store.clone(), layout.clone());
        Self {
            host,
            config,
            layout,
            decoder,
            store,
            resolver,
            phase: InjectionPhase::Idle,
            status: String::new(),
        }
    }

    /// An injector over a host built from the config's site paths.
    pub fn from_config(config: InjectorConfig) -> Self {
        let mut host = Host::new();
        if !config.host.site_paths.is_empty() {
            host.add_finder(Arc::new(SiteFinder::with_layout(
                config.host.site_paths.iter().cloned(),
                &config.injector.extension,
                &config.injector.init_stem,
            )));
        }
        Self::new(host, config)
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut Host {
        &mut self.host
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn phase(&self) -> InjectionPhase {
        self.phase
    }

    /// Last computed status. No side effects.
    pub fn current_status(&self) -> &str {
        &self.status
    }

    /// Activate with one primary bundle and a JSON array of extra bundles.
    pub fn initialize(&mut self, primary: &str, extra_json: &str) -> String {
        self.initialize_with_snippet(primary, extra_json, None)
    }

    /// Like [`Injector::initialize`], running `snippet` after the merge.
    ///
    /// A snippet that leaves a non-`None` `status` variable replaces the
    /// composed status with it.
    pub fn initialize_with_snippet(
        &mut self,
        primary: &str,
        extra_json: &str,
        snippet: Option<&str>,
    ) -> String {
        let previous = self.phase;
        let status = match self.activate(primary, extra_json, snippet) {
            Ok(status) => status,
            Err(err) => {
                self.phase = previous;
                warn!(error = %err, "injection failed");
                format!("Injection error: {}", err)
            }
        };
        info!(phase = %self.phase, status = %status, "injection finished");
        self.set_status(status)
    }

    fn activate(
        &mut self,
        primary: &str,
        extra_json: &str,
        snippet: Option<&str>,
    ) -> Result<String, InjectError> {
        let previous = self.phase;
        self.phase = InjectionPhase::Planning;
        let decoded = self.decode_all(primary, extra_json)?;

        let summary = match self.plan_and_merge(&decoded.maps) {
            Ok(summary) => summary,
            Err(err @ (InjectError::NoBundles | InjectError::PlanningEmpty)) => {
                self.phase = previous;
                err.to_string()
            }
            Err(err) => return Err(err),
        };

        if let Some(source) = snippet.filter(|s| !s.trim().is_empty()) {
            match self.host.run_snippet(source) {
                Ok(module) => match module.get_attr("status") {
                    Some(value) if !matches!(value, Value::None) => return Ok(value.to_string()),
                    _ => {}
                },
                Err(err) => return Ok(format!("Test snippet error: {}", err)),
            }
        }

        let mut sections = vec![summary];
        if self.config.injector.validate {
            let results = self.validate();
            if self.phase == InjectionPhase::Merged {
                self.phase = InjectionPhase::Validated;
            }
            sections.push(status::validation_clause(&results));
        }
        if !decoded.extra_errors.is_empty() {
            sections.push(status::extra_errors_clause(&decoded.extra_errors));
        }
        Ok(status::join_sections(sections))
    }

    /// Decode the primary bundle and every entry of the extra list.
    ///
    /// A bad primary bundle or a malformed list aborts; a bad entry in the
    /// list is recorded and skipped.
    fn decode_all(&self, primary: &str, extra_json: &str) -> Result<Decoded, InjectError> {
        let mut decoded = Decoded {
            maps: Vec::new(),
            extra_errors: Vec::new(),
        };

        decoded.maps.push(self.decoder.decode(primary)?);

        if extra_json.trim().is_empty() {
            return Ok(decoded);
        }

        let list: serde_json::Value = serde_json::from_str(extra_json)
            .map_err(|e| InjectError::ExtraList(format!("Extra bundles JSON error: {}", e)))?;
        let serde_json::Value::Array(items) = list else {
            return Err(InjectError::ExtraList(
                "Extra bundles must be a JSON list of strings".to_string(),
            ));
        };

        for (index, item) in items.iter().enumerate() {
            let Some(text) = item.as_str().filter(|s| !s.trim().is_empty()) else {
                debug!(index, "skipping non-string or blank extra bundle");
                continue;
            };
            match self.decoder.decode(text) {
                Ok(map) => decoded.maps.push(map),
                Err(error) => {
                    warn!(index, error = %error, "extra bundle failed to decode");
                    decoded.extra_errors.push(ExtraBundleError { index, error });
                }
            }
        }
        Ok(decoded)
    }

    /// Classify, merge what the host lacks, and install the resolver.
    fn plan_and_merge(&mut self, maps: &[SourceMap]) -> Result<String, InjectError> {
        if maps.iter().all(|m| m.is_empty()) {
            return Err(InjectError::NoBundles);
        }

        let plan = plan(&self.host, maps, &self.layout);
        if plan.is_empty() {
            return Err(InjectError::PlanningEmpty);
        }

        {
            let mut store = self.store.write();
            for bundle in &plan.to_inject {
                debug!(package = %bundle.name, files = bundle.len(), "merging");
                store.merge(bundle);
            }
        }

        let found = plan.found_names();
        let injected = plan.injected_names();
        if !injected.is_empty() {
            self.resolver.install(&mut self.host);
            self.host.invalidate_caches();
        }
        self.phase = InjectionPhase::Merged;

        let store = self.store.read();
        Ok(status::summary(
            &found,
            &injected,
            &store,
            &self.layout,
            self.config.injector.sample_limit,
        ))
    }

    /// Import every top-level package in the store and record the outcome.
    fn validate(&mut self) -> Vec<ValidationResult> {
        let packages = self.store.read().top_level_packages(&self.layout);
        if packages.is_empty() {
            return Vec::new();
        }

        self.host.invalidate_caches();
        packages
            .into_iter()
            .map(|package| {
                let result = materialize(&mut self.host, &package);
                if let Err(err) = &result {
                    warn!(package = %package, error = %err, "validation failed");
                }
                ValidationResult {
                    verdict: Verdict::from_result(&result),
                    package,
                }
            })
            .collect()
    }

    /// Tear down everything this injector put into the host.
    ///
    /// A no-op when the store is empty. The resolver is uninstalled and the
    /// store cleared even if removing modules from the registry fails.
    pub fn finalize(&mut self) {
        self.finalize_with(unload_packages)
    }

    /// [`Injector::finalize`] with the registry removal step supplied by the
    /// caller.
    pub(crate) fn finalize_with<F>(&mut self, remove: F)
    where
        F: FnOnce(&mut Host, &BTreeSet<String>) -> Result<usize, InjectError>,
    {
        if self.store.read().is_empty() {
            return;
        }
        self.status.clear();

        let packages = self.store.read().top_level_packages(&self.layout);
        let removal = remove(&mut self.host, &packages);

        self.resolver.uninstall(&mut self.host);
        self.store.write().clear();
        self.phase = InjectionPhase::TornDown;

        let status = match removal {
            Ok(removed) => {
                debug!(modules = removed, "registry cleaned");
                status::CLEARED.to_string()
            }
            Err(err) => {
                warn!(error = %err, "cleanup failed");
                err.to_string()
            }
        };
        info!(status = %status, "teardown finished");
        self.set_status(status);
    }

    fn set_status(&mut self, status: String) -> String {
        self.status = status;
        self.status.clone()
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::from_config(InjectorConfig::default())
    }
}

/// Unload every module under `packages`, continuing past failures.
fn unload_packages(host: &mut Host, packages: &BTreeSet<String>) -> Result<usize, InjectError> {
    let mut removed = 0;
    let mut failures = Vec::new();
    for package in packages {
        match host.unload_tree(package) {
            Ok(names) => removed += names.len(),
            Err(err) => failures.push(err.to_string()),
        }
    }
    if failures.is_empty() {
        Ok(removed)
    } else {
        Err(InjectError::Cleanup(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::encode;
    use modinject_engine::FinderKind;

    fn bundle(entries: &[(&str, &str)]) -> String {
        let map: SourceMap = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        encode(&map).unwrap()
    }

    #[test]
    fn test_selftest_activation() {
        let mut injector = Injector::default();
        let status = injector.initialize("__SELFTEST__", "");

        assert_eq!(
            status,
            "INJECTED: mypkg (files=2; per-pkg: mypkg:2; \
             sample: mypkg/__init__.py, mypkg/version.py) || mypkg=Pass"
        );
        assert_eq!(injector.phase(), InjectionPhase::Validated);
        assert_eq!(injector.current_status(), status);
    }

    #[test]
    fn test_blank_primary_reports_no_maps() {
        let mut injector = Injector::default();
        let status = injector.initialize("   ", "");
        assert_eq!(status, "No maps provided. || Validate: no injected packages");
        assert_eq!(injector.phase(), InjectionPhase::Idle);
    }

    #[test]
    fn test_unrecognizable_paths() {
        let mut injector = Injector::default();
        let status = injector.initialize(&bundle(&[("/weird.py", "")]), "");
        assert!(status.starts_with("No recognizable packages in provided maps."));
        assert_eq!(injector.phase(), InjectionPhase::Idle);
        assert!(injector.store().read().is_empty());
    }

    #[test]
    fn test_primary_decode_error_aborts() {
        let mut injector = Injector::default();
        let status = injector.initialize("%%%", "");
        assert!(status.starts_with("Injection error: invalid base64"));
        assert_eq!(injector.phase(), InjectionPhase::Idle);
        assert!(!injector.resolver().is_installed(injector.host()));
    }

    #[test]
    fn test_extra_list_shape_errors() {
        let mut injector = Injector::default();
        assert_eq!(
            injector.initialize("__SELFTEST__", "{\"a\": 1}"),
            "Injection error: Extra bundles must be a JSON list of strings"
        );
        assert!(injector
            .initialize("__SELFTEST__", "[unclosed")
            .starts_with("Injection error: Extra bundles JSON error:"));
        assert!(injector.store().read().is_empty());
    }

    #[test]
    fn test_found_package_is_left_alone() {
        let mut injector = Injector::default();
        let status = injector.initialize(&bundle(&[("sys.py", "raise ValueError('shadow')\n")]), "");

        assert_eq!(status, "FOUND: sys || Validate: no injected packages");
        assert!(injector.store().read().is_empty());
        assert_eq!(injector.host().chain().count_kind(FinderKind::Injected), 0);
        assert!(!injector.host().modules().contains("sys"));
    }

    #[test]
    fn test_snippet_overrides_status() {
        let mut injector = Injector::default();
        let status = injector.initialize_with_snippet(
            "__SELFTEST__",
            "",
            Some("from mypkg import VERSION\nstatus = 'version ' + VERSION\n"),
        );
        assert_eq!(status, "version 0.1.0");
    }

    #[test]
    fn test_snippet_without_status_keeps_summary() {
        let mut injector = Injector::default();
        let status = injector.initialize_with_snippet("__SELFTEST__", "", Some("x = 1\n"));
        assert!(status.starts_with("INJECTED: mypkg"));
    }

    #[test]
    fn test_snippet_error() {
        let mut injector = Injector::default();
        let status =
            injector.initialize_with_snippet("__SELFTEST__", "", Some("import missing_thing\n"));
        assert_eq!(
            status,
            "Test snippet error: ModuleNotFoundError: No module named 'missing_thing'"
        );
    }

    #[test]
    fn test_finalize_without_injection_is_noop() {
        let mut injector = Injector::default();
        injector.initialize("", "");
        let before = injector.current_status().to_string();
        injector.finalize();
        assert_eq!(injector.current_status(), before);
        assert_eq!(injector.phase(), InjectionPhase::Idle);
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let mut config = InjectorConfig::default();
        config.injector.validate = false;
        let mut injector = Injector::from_config(config);

        let status = injector.initialize("__SELFTEST__", "");
        assert!(!status.contains("||"));
        assert_eq!(injector.phase(), InjectionPhase::Merged);
        assert!(!injector.host().modules().contains("mypkg"));
    }

    #[test]
    fn test_finalize_clears_everything() {
        let mut injector = Injector::default();
        injector.initialize("__SELFTEST__", "");
        assert!(injector.host().modules().contains("mypkg.version"));

        injector.finalize();
        assert_eq!(injector.current_status(), status::CLEARED);
        assert_eq!(injector.phase(), InjectionPhase::TornDown);
        assert!(injector.store().read().is_empty());
        assert!(!injector.resolver().is_installed(injector.host()));
        assert!(!injector.host().modules().contains("mypkg"));
        assert!(!injector.host().modules().contains("mypkg.version"));
    }

    #[test]
    fn test_failed_removal_still_tears_down() {
        let mut injector = Injector::default();
        injector.initialize("__SELFTEST__", "");

        injector.finalize_with(|host, packages| {
            assert_eq!(packages.iter().collect::<Vec<_>>(), ["mypkg"]);
            assert!(host.unload_tree("mypkg").is_ok());
            Err(InjectError::Cleanup("cannot unload 'mypkg'".to_string()))
        });

        assert_eq!(
            injector.current_status(),
            "Cleanup error: cannot unload 'mypkg'"
        );
        assert!(!injector.resolver().is_installed(injector.host()));
        assert!(injector.store().read().is_empty());
        assert_eq!(injector.phase(), InjectionPhase::TornDown);

        // The next activation starts from a clean slate.
        let status = injector.initialize("__SELFTEST__", "");
        assert!(status.starts_with("INJECTED: mypkg"));
        assert_eq!(injector.host().chain().count_kind(FinderKind::Injected), 1);
    }

    #[test]
    fn test_normalized_paths_agree_across_status_and_teardown() {
        let primary = bundle(&[
            ("./pkg/__init__.py", "A = 1\n"),
            ("w\\__init__.py", "from .mod import B\n"),
            ("w\\mod.py", "B = 2\n"),
        ]);

        let mut injector = Injector::default();
        let status = injector.initialize(&primary, "");
        assert_eq!(
            status,
            "INJECTED: pkg, w (files=3; per-pkg: pkg:1, w:2; \
             sample: pkg/__init__.py, w/__init__.py, w/mod.py) || pkg=Pass | w=Pass"
        );
        assert!(injector.host().modules().contains("w.mod"));

        injector.finalize();
        assert_eq!(injector.current_status(), status::CLEARED);
        let names = injector.host().modules().names();
        assert!(names.iter().all(|n| n != "pkg" && !n.starts_with('w')));
    }
}
