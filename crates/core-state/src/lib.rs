//! Edit buffer state: undo/redo log, marks, file metadata, async-task
//! lifecycle (spec component C3, spec.md §4.3).

pub mod ebuf;
pub mod error;
pub mod log;
pub mod marks;
pub mod writer;

pub use ebuf::{EBuf, Lifecycle, UndoDir, YANK_GROW};
pub use error::EditError;
pub use log::{LogEntry, MAX_DELETE_RUN};
pub use marks::{MarkList, SEL_BEG, SEL_END};
