use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every failure the recomposition engine can surface.
///
/// None of these are recovered inside the engine, they travel up to the
/// subcommand boundary which reports them and exits non-zero.
#[derive(Debug, Error)]
pub enum MixError {
    #[error("{tool} is required! {detail}")]
    DependencyMissing { tool: String, detail: String },

    #[error("could not find image with the reference: {0}")]
    NotFound(String),

    #[error("found more than one image ({count}) with the reference: {reference}")]
    Ambiguous { reference: String, count: usize },

    #[error("couldn't find any images to merge")]
    NoImagesToMerge,

    #[error("malformed layout {}: {reason}", path.display())]
    MalformedLayout { path: PathBuf, reason: String },

    #[error("history of {} does not match its manifest: {history} non-empty history entries, {layers} layers", path.display())]
    HistoryMismatch { path: PathBuf, history: usize, layers: usize },

    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store operation '{operation}' failed: {detail}")]
    StoreOperationFailure { operation: String, detail: String },
}

impl MixError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> MixError {
        MixError::MalformedLayout {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn write_failure(path: impl Into<PathBuf>, source: io::Error) -> MixError {
        MixError::WriteFailure { path: path.into(), source }
    }

    pub fn store_failure(operation: impl Into<String>, detail: impl Into<String>) -> MixError {
        MixError::StoreOperationFailure {
            operation: operation.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MixError>;
