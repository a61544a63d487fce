//! Error kinds returned by layout operations.

use thiserror::Error;

/// Result alias for core layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors returned by store, propagation, undo and codec operations.
///
/// Every variant is returned to the caller as a value; none of the core
/// operations panic on bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// No snapshot exists at the requested key.
    #[error("no layout saved for spec {spec} at level {level}")]
    NotFound {
        /// Spec index of the missing key
        spec: u8,
        /// Level of the missing key
        level: u8,
    },
    /// Import payload was written by a newer format version.
    #[error("export version {found} is not supported (this build reads up to v{supported})")]
    VersionUnsupported {
        /// Version found in the export string
        found: u32,
        /// Highest version this build supports
        supported: u32,
    },
    /// Export text or value tree could not be decoded.
    #[error("failed to decode export string: {0}")]
    DecodeFailed(String),
    /// Spec index, level or slot index is outside its declared bounds.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    /// Operation needs a source layout that does not exist.
    #[error("nothing to use as source: {0}")]
    EmptySource(String),
    /// Named template does not exist for the spec.
    #[error("template '{0}' not found")]
    UnknownTemplate(String),
    /// Input failed validation (template names, descriptions).
    #[error("{0}")]
    Validation(String),
}

impl LayoutError {
    /// Shorthand for a decode failure with a message.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailed(message.into())
    }

    /// Shorthand for an out-of-bounds target with a message.
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget(message.into())
    }
}
