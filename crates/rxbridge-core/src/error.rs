#![forbid(unsafe_code)]

//! Error types for the cell graph.
//!
//! The split follows the containment policy: failures caused by untrusted
//! external input (inbound conversion, computed functions over arbitrary
//! data, stale renderer edits) are logged and contained by the caller;
//! failures caused by programmer misuse (bad paths) surface immediately as
//! `Err` at the call site.

use thiserror::Error;

/// A structural path lookup or write failed.
///
/// Positions are zero-based indexes into the path that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("missing key '{key}' at path position {pos}")]
    MissingKey { key: String, pos: usize },

    #[error("index {index} out of range (len {len}) at path position {pos}")]
    IndexOutOfRange { index: usize, len: usize, pos: usize },

    #[error("cannot traverse {found} with segment {segment} at path position {pos}")]
    NotAContainer {
        segment: String,
        found: &'static str,
        pos: usize,
    },
}

/// An inbound wire value could not be converted by the cell's codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {value} into {expected}")]
pub struct ConvertError {
    pub expected: &'static str,
    pub value: String,
}

impl ConvertError {
    pub fn new(expected: &'static str, value: &serde_json::Value) -> Self {
        Self {
            expected,
            value: value.to_string(),
        }
    }
}

/// A computed function (or scoped template function) reported failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ComputeError {
    pub message: String,
}

impl ComputeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ConvertError> for ComputeError {
    fn from(err: ConvertError) -> Self {
        Self::new(err.to_string())
    }
}

/// An event-callback invocation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("unknown event callback id {id}")]
    UnknownCallback { id: u64 },

    #[error("event callback failed: {message}")]
    HandlerFailed { message: String },
}

impl EventError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::HandlerFailed {
            message: message.into(),
        }
    }
}

/// Umbrella error for registry-level operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("unknown cell id {id}")]
    UnknownCell { id: u64 },

    #[error("unknown scoped function id {id}")]
    UnknownScopedFn { id: u64 },
}
