//! Grouping decoded maps by top-level package and deciding which groups the
//! host can already satisfy.

use std::collections::BTreeMap;

use modinject_engine::{FinderKind, Host, ModuleName};
use tracing::debug;

use crate::bundle::{normalize_path, SourceLayout, SourceMap};

/// Entries of one map that share a top-level package name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageBundle {
    pub name: String,
    pub entries: SourceMap,
}

impl PackageBundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: SourceMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Top-level package a virtual path belongs to.
///
/// `pkg/sub/mod.py` belongs to `pkg`; a single-file `solo.py` to `solo`.
/// Returns `None` when no usable name can be extracted (empty or dotted).
pub fn top_level_name(path: &str, layout: &SourceLayout) -> Option<String> {
    let name = match path.split_once('/') {
        Some((head, _)) => head,
        None => path.strip_suffix(&layout.suffix()).unwrap_or(path),
    };
    if name.is_empty() || name.contains('.') {
        return None;
    }
    Some(name.to_string())
}

/// Group `map` by top-level package. Paths are normalized first; paths with
/// no usable name are dropped.
pub fn partition(map: &SourceMap, layout: &SourceLayout) -> BTreeMap<String, PackageBundle> {
    let mut groups: BTreeMap<String, PackageBundle> = BTreeMap::new();
    for (raw, text) in map {
        let path = normalize_path(raw);
        let Some(name) = top_level_name(&path, layout) else {
            debug!(path = %path, "no top-level package; skipping");
            continue;
        };
        groups
            .entry(name.clone())
            .or_insert_with(|| PackageBundle::new(name))
            .entries
            .insert(path, text.clone());
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    AlreadySatisfied,
    NeedsInjection,
}

/// Probe the host's normal resolution path for `package`.
///
/// Injected finders are skipped and nothing is loaded. A probe that errors
/// counts as not satisfiable.
pub fn classify(host: &Host, package: &str) -> Classification {
    let Some(name) = ModuleName::parse(package) else {
        return Classification::NeedsInjection;
    };
    match host.find_spec_with(&name, None, |f| f.kind() != FinderKind::Injected) {
        Ok(Some(_)) => Classification::AlreadySatisfied,
        Ok(None) => Classification::NeedsInjection,
        Err(err) => {
            debug!(package = %package, error = %err, "probe failed");
            Classification::NeedsInjection
        }
    }
}

/// What one injection request will do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionPlan {
    pub to_inject: Vec<PackageBundle>,
    pub already_satisfied: Vec<String>,
}

impl InjectionPlan {
    pub fn is_empty(&self) -> bool {
        self.to_inject.is_empty() && self.already_satisfied.is_empty()
    }

    /// Injected package names, sorted and de-duplicated.
    pub fn injected_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.to_inject.iter().map(|b| b.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Satisfied package names, sorted and de-duplicated.
    pub fn found_names(&self) -> Vec<String> {
        let mut names = self.already_satisfied.clone();
        names.sort();
        names.dedup();
        names
    }
}

/// Partition every map and classify each package against `host`.
///
/// Bundles keep the order of `maps`, so merging them in order gives the
/// last-supplied bundle the final word on a shared path.
pub fn plan(host: &Host, maps: &[SourceMap], layout: &SourceLayout) -> InjectionPlan {
    let mut plan = InjectionPlan::default();
    for map in maps {
        for (name, bundle) in partition(map, layout) {
            match classify(host, &name) {
                Classification::AlreadySatisfied => plan.already_satisfied.push(name),
                Classification::NeedsInjection => plan.to_inject.push(bundle),
            }
        }
    }
    plan
}
