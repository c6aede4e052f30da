//! Single-threaded, cooperative, `poll(2)`-backed event loop (spec
//! component C4, spec.md §4.4).

pub mod alarm;
pub mod error;
pub mod reactor;

pub use alarm::{AlarmCallback, AlarmHeap, MAX_ALARMS};
pub use error::EventError;
pub use reactor::{EventLoop, FdCallback, Interest};
