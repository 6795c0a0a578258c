// src/error.rs
//! Crate-wide error handling.
//!
//! Graph-invariant violations have their own type (`GraphError` in
//! `vertex_graph`); everything else funnels into [`Error`] so public APIs
//! return `promesh::Result<T>` and propagate with `?`. Parse failures
//! always carry the 1-based source line.

use thiserror::Error;

use crate::vertex_graph::GraphError;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O at the file boundary.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization of reduction metadata or viewer documents.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Graph invariant violations bubbling out of mutation.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Malformed input line: bad float, wrong arity, unknown face index.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// OBJ constructs the engine deliberately refuses (`vp`, `l`, n-gons).
    #[error("line {line}: unsupported feature: {feature}")]
    Unsupported { line: usize, feature: String },

    /// `reduce()` called on a model that already carries a reduction log.
    #[error("model already carries a reduction log")]
    AlreadyReduced,

    /// `reproduce()` called with nothing to replay.
    #[error("model has no reduction log to replay")]
    NotReduced,

    /// `reduce()` needs an iteration cap, a stopping condition, or both.
    #[error("reduce requires an iteration cap or a stopping condition")]
    MissingStopCondition,
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(line: usize, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            line,
            feature: feature.into(),
        }
    }
}

/// Convenient `Result` alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
