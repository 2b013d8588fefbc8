//! Event Error Types

use thiserror::Error;

/// Errors raised while building or decoding an [`Event`](crate::Event)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    /// Severity outside `low|mid|high|critical`
    #[error("Invalid severity: {0}")]
    InvalidSeverity(String),

    /// Distance estimates are never negative
    #[error("Invalid distance: {0} m is negative")]
    NegativeDistance(f64),

    /// NaN or infinite distances cannot be serialized faithfully
    #[error("Invalid distance: {0} m is not finite")]
    NonFiniteDistance(f64),

    /// Source outside `camera|tof`
    #[error("Invalid event source: {0}")]
    InvalidSource(String),

    /// Direction outside `left|center|right|down`
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    /// Structured form could not be decoded
    #[error("Malformed event payload: {0}")]
    Malformed(String),
}

/// Errors reported by a bus subscriber
#[derive(Debug, Error)]
pub enum BusError {
    /// Subscriber returned an error
    #[error("Subscriber #{index} on '{topic}' failed: {reason}")]
    Subscriber {
        topic: String,
        index: usize,
        reason: String,
    },

    /// Subscriber panicked during delivery
    #[error("Subscriber #{index} on '{topic}' panicked")]
    Panicked { topic: String, index: usize },
}
