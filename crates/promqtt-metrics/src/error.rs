//! Request-level errors for metric queries.

use thiserror::Error;

/// A query that cannot be answered because its parameters are malformed.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("must pass topic")]
    MissingTopic,

    #[error("invalid topic pattern: {0}")]
    InvalidTopic(#[source] regex::Error),

    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[source] regex::Error),
}

impl QueryError {
    /// The request parameter at fault.
    pub fn parameter(&self) -> &'static str {
        match self {
            QueryError::MissingTopic | QueryError::InvalidTopic(_) => "topic",
            QueryError::InvalidRegex(_) => "regex",
        }
    }
}
