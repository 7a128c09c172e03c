//! Uniform outcome of every service operation and workflow.

use serde_json::Value;
use thiserror::Error;

/// Outcome of a single tool-level operation.
///
/// `Ok` carries the operation's data. `Err` carries a human-readable failure
/// and, for workflows that stopped half way, the side effect that did happen.
pub type Envelope<T> = std::result::Result<T, ToolFailure>;

/// Failure branch of an [`Envelope`]
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ToolFailure {
    /// Message surfaced to the caller verbatim
    pub message: String,

    /// Already-completed side effect, if any
    pub partial: Option<Value>,
}

impl ToolFailure {
    /// A failure where nothing happened
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            partial: None,
        }
    }

    /// A failure after an earlier step already produced `partial`
    pub fn with_partial(message: impl Into<String>, partial: Value) -> Self {
        Self {
            message: message.into(),
            partial: Some(partial),
        }
    }
}

/// Fold an internal result into an envelope, prefixing the failure with `context`.
pub(crate) fn wrap<T>(result: crate::error::Result<T>, context: &str) -> Envelope<T> {
    result.map_err(|e| {
        tracing::debug!("{}: {}", context, e);
        ToolFailure::new(format!("{}: {}", context, e))
    })
}

/// Serialize typed envelope data into a JSON value for the transport.
pub(crate) fn into_value<T: serde::Serialize>(envelope: Envelope<T>) -> Envelope<Value> {
    envelope.and_then(|data| {
        serde_json::to_value(data)
            .map_err(|e| ToolFailure::new(format!("Failed to serialize result: {}", e)))
    })
}
