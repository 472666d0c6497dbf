//! Dotted module names.

use std::fmt;

/// An absolute, dotted module name such as `pkg.sub.leaf`.
///
/// Always has at least one segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleName(Vec<String>);

impl ModuleName {
    /// Parse a dotted name. Returns `None` for an empty name or an empty
    /// segment (`"a..b"`, `".a"`).
    pub fn parse(dotted: &str) -> Option<Self> {
        let segments: Vec<String> = dotted.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self(segments))
    }

    /// Parse a literal dotted name known to be well formed.
    ///
    /// # Panics
    /// Panics on an empty name or empty segment.
    pub(crate) fn from_dotted(dotted: &str) -> Self {
        match Self::parse(dotted) {
            Some(name) => name,
            None => panic!("invalid module name: {:?}", dotted),
        }
    }

    /// Build a name from segments. `None` when there are no segments or one
    /// of them is empty or contains a dot.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        let segments: Vec<String> = segments.iter().map(|s| s.as_ref().to_string()).collect();
        if segments.iter().any(|s| s.is_empty() || s.contains('.')) {
            return None;
        }
        Some(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// First segment: the top-level package.
    pub fn head(&self) -> &str {
        &self.0[0]
    }

    /// Last segment.
    pub fn tail(&self) -> &str {
        &self.0[self.0.len() - 1]
    }

    pub fn parent(&self) -> Option<ModuleName> {
        self.strip_last(1)
    }

    /// Removes `n` segments from the end; `None` if that would leave nothing.
    pub fn strip_last(&self, n: usize) -> Option<ModuleName> {
        if n >= self.0.len() {
            return None;
        }
        Some(ModuleName(self.0[..self.0.len() - n].to_vec()))
    }

    pub fn join<I>(&self, tail: I) -> ModuleName
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut segments = self.0.clone();
        segments.extend(tail.into_iter().map(|s| s.as_ref().to_string()));
        ModuleName(segments)
    }

    /// Slash-joined form used for virtual file paths (`a/b/c`).
    pub fn to_path(&self) -> String {
        self.0.join("/")
    }

    pub fn as_str(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
