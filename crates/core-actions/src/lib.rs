//! The command layer: textual line commands and shell-pipe integration
//! (spec component C6, spec.md §4.6), plus the interpreter for the small
//! set of operator+motion commands the modal parser (C7) hands back
//! unexecuted (spec.md §4.7's `d`+motion, etc.).
//!
//! Grounded on `original_source/exec.c`'s `etab`/`lookup`/`get`/`look`/
//! `run`/`Run`/`runev`. `exec.c` itself only lists `Get` and `Look` in
//! `etab[]` before falling through to a shell command; `Put`, `New` and
//! `Del` are this layer's own builtins, named the way Acme's real command
//! set names them, built directly on `core-state`'s existing file I/O and
//! window-management primitives rather than on any donor C function.

pub mod cmdlayer;
pub mod ops;
pub mod task;

use core_state::EBuf;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared ownership of one document. `Task`s spawned against a document
/// hold their own clone, independent of whatever the dispatcher's
/// "current document" slot later points to (spec.md §4.3.4: a killed
/// buffer survives as a zombie until every outstanding task releases its
/// hold). Single-threaded, so `Rc`, not `Arc`.
pub type EBufHandle = Rc<RefCell<EBuf>>;

pub fn new_handle(eb: EBuf) -> EBufHandle {
    Rc::new(RefCell::new(eb))
}
