//! Errors raised by the core.
//!
//! Only structural precondition violations are errors. Short series, missing
//! optional columns and risk rejections are ordinary values.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("bar {index} has timestamp {current} which does not follow {previous}")]
    InvalidTimestampOrdering {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}
