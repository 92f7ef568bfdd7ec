//! Typed error kinds raised by the dataset pipeline.
//!
//! Functions in this crate return [anyhow::Result]. Errors of a known kind
//! are raised as [DataError] so that callers can recover the kind with
//! `error.downcast_ref::<DataError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// A category name outside the class vocabulary, or a class index the
    /// grid cannot hold.
    #[error("validation error: {0}")]
    Validation(String),
    /// A box with inverted or non-finite coordinates under the reject policy.
    #[error("degenerate box {index} in '{filename}': {reason}")]
    DegenerateBox {
        filename: String,
        index: usize,
        reason: String,
    },
    /// A missing or unreadable source file, or an unwritable destination.
    #[error("i/o error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A malformed serialized record.
    #[error("format error: {0}")]
    Format(String),
    /// Corrupt or unsupported image bytes.
    #[error("failed to decode image '{filename}': {source}")]
    Decode {
        filename: String,
        #[source]
        source: image::ImageError,
    },
}

impl DataError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for the error kinds that reject a record's content.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::DegenerateBox { .. })
    }
}
