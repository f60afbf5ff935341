//! Error types for Tributary

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TributaryError>;

#[derive(Error, Debug)]
pub enum TributaryError {
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

/// Errors produced while parsing a dotted state path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("empty segment in path '{0}'")]
    EmptySegment(String),
}

/// Errors surfaced by a dispatched action.
///
/// Action bodies fail with `anyhow::Error`; the runner wraps the failure
/// with the action's registered name before it reaches the dispatcher.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("action '{name}' failed: {source}")]
    Failed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("action task aborted: {0}")]
    Aborted(String),
}
