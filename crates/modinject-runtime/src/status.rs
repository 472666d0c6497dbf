//! Status string composition.
//!
//! A full activation status reads
//! `FOUND: a | INJECTED: b (files=2; per-pkg: b:2; sample: b/__init__.py, b/x.py) || b=Pass`.

use std::collections::BTreeMap;
use std::fmt;

use crate::bundle::{top_level_name, DecodeError, SourceLayout};
use crate::error::LoadError;
use crate::store::VirtualStore;

pub const CLEARED: &str = "Injection cleared";
pub const NO_INJECTED_PACKAGES: &str = "Validate: no injected packages";

const CLAUSE_SEPARATOR: &str = " | ";
const SECTION_SEPARATOR: &str = " || ";

/// `FOUND: ... | INJECTED: ...` for one activation.
///
/// `found` and `injected` must be sorted and de-duplicated. Counts and the
/// sample cover only this activation's injected packages; `files=` is the
/// size of the whole store.
pub fn summary(
    found: &[String],
    injected: &[String],
    store: &VirtualStore,
    layout: &SourceLayout,
    sample_limit: usize,
) -> String {
    let mut parts = Vec::new();

    if !found.is_empty() {
        parts.push(format!("FOUND: {}", found.join(", ")));
    }

    if !injected.is_empty() {
        let mut per_package: BTreeMap<String, usize> = BTreeMap::new();
        let mut sample = Vec::new();
        for path in store.paths() {
            let Some(top) = top_level_name(path, layout) else {
                continue;
            };
            if !injected.contains(&top) {
                continue;
            }
            *per_package.entry(top).or_default() += 1;
            if sample.len() < sample_limit {
                sample.push(path);
            }
        }

        let counts: Vec<String> = per_package
            .iter()
            .map(|(name, count)| format!("{}:{}", name, count))
            .collect();
        let mut detail = format!(
            "INJECTED: {} (files={}; per-pkg: {}",
            injected.join(", "),
            store.len(),
            counts.join(", ")
        );
        if !sample.is_empty() {
            detail.push_str(&format!("; sample: {}", sample.join(", ")));
        }
        detail.push(')');
        parts.push(detail);
    }

    parts.join(CLAUSE_SEPARATOR)
}

/// Outcome of importing one injected package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Carries the exception kind name
    Fail(String),
}

impl Verdict {
    pub fn from_result<T>(result: &Result<T, LoadError>) -> Self {
        match result {
            Ok(_) => Verdict::Pass,
            Err(err) => Verdict::Fail(err.kind().to_string()),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// `pkg=Pass` / `pkg=Fail(Kind)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub package: String,
    pub verdict: Verdict,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            Verdict::Pass => write!(f, "{}=Pass", self.package),
            Verdict::Fail(kind) => write!(f, "{}=Fail({})", self.package, kind),
        }
    }
}

pub fn validation_clause(results: &[ValidationResult]) -> String {
    if results.is_empty() {
        return NO_INJECTED_PACKAGES.to_string();
    }
    results
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(CLAUSE_SEPARATOR)
}

/// An extra bundle that failed to decode; the rest of the list still ran.
#[derive(Debug)]
pub struct ExtraBundleError {
    /// Position in the extra-bundle JSON array
    pub index: usize,
    pub error: DecodeError,
}

impl fmt::Display for ExtraBundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {}", self.index, self.error)
    }
}

pub fn extra_errors_clause(errors: &[ExtraBundleError]) -> String {
    let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("EXTRA ERRORS: {}", details.join("; "))
}

/// Join the non-empty sections with ` || `.
pub fn join_sections<I, S>(sections: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    sections
        .into_iter()
        .filter(|s| !s.as_ref().is_empty())
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::PackageBundle;

    fn store(paths: &[&str]) -> VirtualStore {
        let mut store = VirtualStore::new();
        let mut bundle = PackageBundle::new("any");
        for path in paths {
            bundle.entries.insert(path.to_string(), String::new());
        }
        store.merge(&bundle);
        store
    }

    #[test]
    fn test_summary_found_and_injected() {
        let store = store(&["mypkg/__init__.py", "mypkg/version.py"]);
        let text = summary(
            &["sys".to_string()],
            &["mypkg".to_string()],
            &store,
            &SourceLayout::default(),
            5,
        );
        assert_eq!(
            text,
            "FOUND: sys | INJECTED: mypkg (files=2; per-pkg: mypkg:2; \
             sample: mypkg/__init__.py, mypkg/version.py)"
        );
    }

    #[test]
    fn test_summary_counts_only_this_activation() {
        let store = store(&["old/__init__.py", "new/a.py", "new/b.py", "new/c.py"]);
        let text = summary(&[], &["new".to_string()], &store, &SourceLayout::default(), 2);
        assert_eq!(
            text,
            "INJECTED: new (files=4; per-pkg: new:3; sample: new/a.py, new/b.py)"
        );
    }

    #[test]
    fn test_validation_clause() {
        assert_eq!(validation_clause(&[]), NO_INJECTED_PACKAGES);
        let results = vec![
            ValidationResult {
                package: "a".into(),
                verdict: Verdict::Pass,
            },
            ValidationResult {
                package: "b".into(),
                verdict: Verdict::Fail("ValueError".into()),
            },
        ];
        assert_eq!(validation_clause(&results), "a=Pass | b=Fail(ValueError)");
    }

    #[test]
    fn test_join_sections_skips_empty() {
        assert_eq!(join_sections(["a", "", "b"]), "a || b");
    }
}
