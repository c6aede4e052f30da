//! User-facing recoverable error kinds (spec.md §7).
//!
//! Internal invariant violations (broken page links, unreachable log
//! tags) are *not* represented here — per §7 and SPEC_FULL.md's ambient
//! stack section they are `panic!`/`unreachable!`, matching the donor's
//! treatment of corrupted internal state. `EditError` covers only the
//! conditions a user can hit and recover from, each surfaced by the
//! command layer (C6) as a line appended after the offending command.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    #[error("no file to read from")]
    NoFileToRead,
    #[error("no file to write to")]
    NoFileToWrite,
    #[error("file exists")]
    FileExists,
    #[error("file changed on disk")]
    FileChangedOnDisk,
    #[error("file not written")]
    FileNotWritten,
    #[error("cannot open file")]
    CannotOpenFile,
    #[error("no match")]
    NoMatch,
    #[error("no more windows")]
    NoMoreWindows,
    #[error("last window")]
    LastWindow,
    #[error("erroneous command")]
    ErroneousCommand,
}
