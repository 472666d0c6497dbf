//! Injection error types.

use modinject_engine::RaisedError;
use thiserror::Error;

use crate::bundle::DecodeError;

/// A module supplied by the store raised while its body executed.
#[derive(Debug, Clone, Error)]
#[error("failed to load '{name}': {source}")]
pub struct LoadError {
    pub name: String,
    #[source]
    pub source: RaisedError,
}

impl LoadError {
    pub fn new(name: impl Into<String>, source: RaisedError) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// Exception kind name of the underlying failure.
    pub fn kind(&self) -> &str {
        self.source.kind()
    }
}

/// Errors reported by the injection controller.
#[derive(Debug, Error)]
pub enum InjectError {
    /// The primary bundle could not be decoded
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// The extra-bundle list is not a JSON array of strings
    #[error("{0}")]
    ExtraList(String),

    /// No package name could be extracted from any path
    #[error("No recognizable packages in provided maps.")]
    PlanningEmpty,

    /// Every supplied bundle was empty
    #[error("No maps provided.")]
    NoBundles,

    /// Teardown failed while removing modules from the registry
    #[error("Cleanup error: {0}")]
    Cleanup(String),
}
