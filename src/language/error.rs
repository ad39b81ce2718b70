//! Error types for loading grammar tables.

use thiserror::Error;

/// Errors that can occur while loading a language.
///
/// These are the only failures surfaced to callers: invalid source text never
/// fails, it produces ERROR and MISSING nodes instead.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The compiled grammar blob is structurally invalid.
    #[error("malformed grammar tables: {0}")]
    MalformedTables(String),

    /// The blob's format version is outside the supported range.
    #[error("grammar table version {found} is not supported (expected {min}..={max})")]
    VersionMismatch { found: u32, min: u32, max: u32 },

    /// IO error while reading a blob from disk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Create a malformed-tables error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedTables(message.into())
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedTables(_))
    }

    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, Self::VersionMismatch { .. })
    }
}
