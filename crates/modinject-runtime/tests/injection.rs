//! End-to-end activation and teardown against a real host.

use std::fs;
use std::path::Path;

use modinject_engine::{FinderKind, Host, Value};
use modinject_runtime::{
    encode, extra_list_json, materialize, InjectionPhase, Injector, InjectorConfig, PackageBundle,
    Resolver, SourceLayout, SourceMap, VirtualStore,
};

fn map(entries: &[(&str, &str)]) -> SourceMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn bundle(entries: &[(&str, &str)]) -> String {
    encode(&map(entries)).unwrap()
}

fn write(root: &Path, rel: &str, source: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, source).unwrap();
}

fn injector_with_site(site: &Path) -> Injector {
    let mut config = InjectorConfig::default();
    config.host.site_paths.push(site.to_path_buf());
    Injector::from_config(config)
}

#[test]
fn test_selftest_round_trip() {
    let mut injector = Injector::default();
    let status = injector.initialize("__SELFTEST__", "");
    assert!(status.contains("INJECTED: mypkg"));

    let version = injector.host_mut().import("mypkg.version").unwrap();
    assert_eq!(version.get_attr("VERSION"), Some(Value::Str("0.1.0".into())));
    assert_eq!(version.origin(), "mypkg/version.py");
    assert_eq!(version.package(), "mypkg");

    let pkg = injector.host().modules().get("mypkg").unwrap();
    assert!(pkg.is_package());
    assert_eq!(pkg.origin(), "mypkg/__init__.py");
    assert_eq!(pkg.get_attr("VERSION"), Some(Value::Str("0.1.0".into())));
}

#[test]
fn test_repeated_activation_installs_one_resolver() {
    let mut injector = Injector::default();
    injector.initialize("__SELFTEST__", "");
    injector.initialize(&bundle(&[("other.py", "A = 1\n")]), "");

    let chain = injector.host().chain();
    assert_eq!(chain.count_kind(FinderKind::Injected), 1);
    assert_eq!(chain.kinds()[0], FinderKind::Injected);
}

#[test]
fn test_second_activation_revalidates_whole_store() {
    let mut injector = Injector::default();
    injector.initialize("__SELFTEST__", "");
    let status = injector.initialize(&bundle(&[("other.py", "A = 1\n")]), "");

    assert_eq!(
        status,
        "INJECTED: other (files=3; per-pkg: other:1; sample: other.py) \
         || mypkg=Pass | other=Pass"
    );
}

#[test]
fn test_site_package_is_found_not_injected() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "realpkg/__init__.py", "SOURCE = 'disk'\n");

    let mut injector = injector_with_site(site.path());
    let status = injector.initialize(
        &bundle(&[
            ("realpkg/__init__.py", "SOURCE = 'bundle'\n"),
            ("newpkg/__init__.py", "SOURCE = 'bundle'\n"),
        ]),
        "",
    );

    assert!(status.starts_with("FOUND: realpkg | INJECTED: newpkg"));
    assert!(status.ends_with("|| newpkg=Pass"));
    let store = injector.store().read();
    assert!(!store.contains("realpkg/__init__.py"));
    assert!(store.contains("newpkg/__init__.py"));
    drop(store);
    assert!(!injector.host().modules().contains("realpkg"));

    let real = injector.host_mut().import("realpkg").unwrap();
    assert_eq!(real.get_attr("SOURCE"), Some(Value::Str("disk".into())));
}

#[test]
fn test_teardown_then_reactivation_is_identical() {
    let primary = bundle(&[
        ("app/__init__.py", "from .core import run\n"),
        ("app/core.py", "run = 'running'\n"),
    ]);

    let mut injector = Injector::default();
    let first = injector.initialize(&primary, "");
    injector.finalize();

    assert_eq!(injector.current_status(), "Injection cleared");
    assert_eq!(injector.phase(), InjectionPhase::TornDown);
    assert!(injector.store().read().is_empty());
    assert_eq!(injector.host().chain().count_kind(FinderKind::Injected), 0);
    assert!(injector.host().modules().names().iter().all(|n| !n.starts_with("app")));
    assert!(injector.host_mut().import("app").is_err());

    let second = injector.initialize(&primary, "");
    assert_eq!(first, second);
    assert_eq!(injector.host().chain().count_kind(FinderKind::Injected), 1);
}

#[test]
fn test_teardown_leaves_unrelated_modules() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "appendix.py", "X = 1\n");

    let mut injector = injector_with_site(site.path());
    injector.initialize(&bundle(&[("app.py", "Y = 2\n")]), "");
    injector.host_mut().import("appendix").unwrap();
    injector.host_mut().import("sys").unwrap();

    injector.finalize();
    assert!(injector.host().modules().contains("appendix"));
    assert!(injector.host().modules().contains("sys"));
    assert!(!injector.host().modules().contains("app"));
}

#[test]
fn test_bad_extra_bundle_is_isolated() {
    let good = bundle(&[("good.py", "OK = True\n")]);
    let extra = extra_list_json(&[
        "!!! not a bundle !!!".to_string(),
        good,
        String::new(),
    ]);

    let mut injector = Injector::default();
    let status = injector.initialize("__SELFTEST__", &extra);

    assert!(status.contains("INJECTED: good, mypkg"));
    assert!(status.contains("good=Pass | mypkg=Pass"));
    assert!(status.contains(" || EXTRA ERRORS: #0: invalid base64"));
    assert!(injector.store().read().contains("good.py"));
}

#[test]
fn test_failing_package_reported_without_blocking_others() {
    let primary = bundle(&[
        ("broken/__init__.py", "raise ValueError('broken on purpose')\n"),
        ("fine/__init__.py", "OK = 1\n"),
        ("typo/__init__.py", "x = = 1\n"),
    ]);

    let mut injector = Injector::default();
    let status = injector.initialize(&primary, "");

    assert!(status.ends_with(
        "|| broken=Fail(ValueError) | fine=Pass | typo=Fail(SyntaxError)"
    ));
    assert_eq!(injector.store().read().len(), 3);
    assert!(!injector.host().modules().contains("broken"));

    let err = materialize(injector.host_mut(), "broken").unwrap_err();
    assert_eq!(err.name, "broken");
    assert_eq!(err.kind(), "ValueError");
}

#[test]
fn test_later_bundle_wins_on_shared_path() {
    let first = bundle(&[("dup.py", "WHO = 'first'\n")]);
    let second = bundle(&[("dup.py", "WHO = 'second'\n")]);

    let mut injector = Injector::default();
    injector.initialize(&first, &extra_list_json(&[second]));

    let module = injector.host_mut().import("dup").unwrap();
    assert_eq!(module.get_attr("WHO"), Some(Value::Str("second".into())));
}

#[test]
fn test_nested_packages_resolve_through_store() {
    let primary = bundle(&[
        ("outer/__init__.py", ""),
        ("outer/mid/__init__.py", "from .leaf import VALUE\n"),
        ("outer/mid/leaf.py", "from .. import __name__ as parent\nVALUE = parent + '.mid'\n"),
    ]);

    let mut injector = Injector::default();
    injector.initialize(&primary, "");

    let mid = injector.host_mut().import("outer.mid").unwrap();
    assert_eq!(mid.get_attr("VALUE"), Some(Value::Str("outer.mid".into())));
    assert_eq!(mid.search_path(), Some(&["outer.mid".to_string()][..]));
}

// Both `dual.py` and `dual/__init__.py` present: the leaf currently wins.
// This pins down existing behavior for ambiguous bundles; it is not a
// guarantee callers should rely on.
#[test]
fn test_ambiguous_leaf_and_package_prefers_leaf() {
    let primary = bundle(&[
        ("dual.py", "KIND = 'leaf'\n"),
        ("dual/__init__.py", "KIND = 'package'\n"),
    ]);

    let mut injector = Injector::default();
    injector.initialize(&primary, "");

    let module = injector.host_mut().import("dual").unwrap();
    assert_eq!(module.get_attr("KIND"), Some(Value::Str("leaf".into())));
    assert!(!module.is_package());
}

#[test]
fn test_front_priority_shadows_site_package() {
    let site = tempfile::tempdir().unwrap();
    let mut injector = injector_with_site(site.path());
    injector.initialize(&bundle(&[("tool/__init__.py", "ORIGIN = 'store'\n")]), "");

    // Installed on disk after activation; the resolver still comes first.
    write(site.path(), "tool/__init__.py", "ORIGIN = 'disk'\n");
    injector.host().invalidate_caches();
    injector.host_mut().modules_mut().remove("tool");

    let module = injector.host_mut().import("tool").unwrap();
    assert_eq!(module.get_attr("ORIGIN"), Some(Value::Str("store".into())));
}

#[test]
fn test_resolver_shadows_builtin_module() {
    let store = VirtualStore::shared();
    let mut shadow = PackageBundle::new("sys");
    shadow
        .entries
        .insert("sys.py".to_string(), "version = 'shadowed'\n".to_string());
    store.write().merge(&shadow);

    let mut host = Host::new();
    let mut resolver = Resolver::new(store, SourceLayout::default());
    resolver.install(&mut host);

    let sys = host.import("sys").unwrap();
    assert_eq!(sys.get_attr("version"), Some(Value::Str("shadowed".into())));
}

#[test]
fn test_custom_layout_from_config() {
    let config = InjectorConfig::from_str(
        "[injector]\nextension = \"mi\"\ninit-stem = \"__pkg__\"\nsample-limit = 1\n",
    )
    .unwrap();

    let mut injector = Injector::from_config(config);
    let status = injector.initialize("__SELFTEST__", "");
    assert_eq!(
        status,
        "INJECTED: mypkg (files=2; per-pkg: mypkg:2; sample: mypkg/__pkg__.mi) || mypkg=Pass"
    );
}
