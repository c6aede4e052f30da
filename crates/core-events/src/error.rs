//! Event-loop error kinds (spec.md §4.4).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("alarm queue is full")]
    AlarmQueueFull,
    #[error("poll(2) failed: {0}")]
    Poll(#[source] std::io::Error),
}

impl From<crate::alarm::AlarmQueueFull> for EventError {
    fn from(_: crate::alarm::AlarmQueueFull) -> Self {
        EventError::AlarmQueueFull
    }
}
