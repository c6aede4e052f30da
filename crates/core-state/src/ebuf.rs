//! Edit buffer `EBuf` (spec component C3, spec.md §4.3).
//!
//! Grounded on `original_source/edit.c`'s `Buf`-wrapping `Text`/`Buffer`
//! struct (file metadata, undo/redo stacks, marks, async task list) and
//! `edit.h`'s reference-counted lifecycle, reimplemented per §9 as an
//! explicit `Live`/`Zombie` enum rather than a raw refcount.

use crate::error::EditError;
use crate::log::{LogEntry, log_delete_rune, log_insert};
use crate::marks::MarkList;
use core_text::{Buf, Rune, decode};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};

/// Preferred yank-buffer capacity growth/shrink increment
/// (`original_source/edit.c`'s `YankSize`).
pub const YANK_GROW: usize = 128;

/// Direction of a call into the shared undo/redo replay routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoDir {
    Undo,
    Redo,
}

/// Whether an `EBuf` is still addressable by new edits, or has been
/// killed but is waiting on outstanding async `Task`s to release their
/// hold before it can be dropped (spec.md §4.3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Live,
    Zombie { remaining: usize },
}

pub struct EBuf {
    buf: Buf,
    undo: Vec<LogEntry>,
    redo: Vec<LogEntry>,
    revision: u32,
    /// True when edits have accrued since the last `commit()`.
    dirty: bool,
    marks: MarkList,
    path: Option<PathBuf>,
    mtime: Option<SystemTime>,
    /// Revision number at the time of the last successful write.
    frev: u32,
    lifecycle: Lifecycle,
    /// Count of outstanding `Task`s holding a reference to this buffer.
    active_holds: usize,
    yank_cap_hint: usize,
}

impl Default for EBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl EBuf {
    pub fn new() -> Self {
        EBuf {
            buf: Buf::new(),
            undo: Vec::new(),
            redo: Vec::new(),
            revision: 0,
            dirty: false,
            marks: MarkList::new(),
            path: None,
            mtime: None,
            frev: 0,
            lifecycle: Lifecycle::Live,
            active_holds: 0,
            yank_cap_hint: YANK_GROW,
        }
    }

    pub fn buf(&self) -> &Buf {
        &self.buf
    }

    pub fn buf_mut(&mut self) -> &mut Buf {
        &mut self.buf
    }

    pub fn marks(&self) -> &MarkList {
        &self.marks
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_zombie(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Zombie { .. })
    }

    pub fn is_modified(&self) -> bool {
        self.revision != self.frev
    }

    // ---- mutation (§4.3) ----------------------------------------------

    pub fn ins(&mut self, p0: usize, r: Rune) {
        self.buf.ins(p0, r);
        log_insert(&mut self.undo, p0, 1);
        self.marks.rebase_insert(p0, 1);
        self.redo.clear();
        self.dirty = true;
        trace!(target: "state.undo", p0, "ins");
    }

    /// Insert decoded UTF-8 `bytes` at `p0`, one rune at a time (malformed
    /// sequences become U+FFFD per §6.1). Returns the number of runes
    /// inserted.
    pub fn ins_utf8(&mut self, p0: usize, bytes: &[u8]) -> usize {
        let mut pos = p0;
        let mut off = 0usize;
        let mut count = 0usize;
        while off < bytes.len() {
            match decode(&bytes[off..]) {
                Some((r, n)) => {
                    self.ins(pos, r);
                    pos += 1;
                    off += n;
                    count += 1;
                }
                None => {
                    // Truncated trailing sequence: one U+FFFD per
                    // remaining byte (§9 open question, resolved).
                    for _ in off..bytes.len() {
                        self.ins(pos, core_text::WRONGRUNE);
                        pos += 1;
                        count += 1;
                    }
                    break;
                }
            }
        }
        count
    }

    pub fn del(&mut self, p0: usize, p1: usize) {
        if p1 <= p0 {
            return;
        }
        for pos in (p0..p1).rev() {
            let r = self.buf.get(pos);
            self.buf.del(pos);
            log_delete_rune(&mut self.undo, pos, r);
        }
        self.marks.rebase_delete(p0, p1 - p0);
        self.redo.clear();
        self.dirty = true;
        trace!(target: "state.undo", p0, p1, "del");
    }

    /// Close the current change group (§4.3 `commit`). Redundant (no-op)
    /// if nothing has changed since the last commit.
    pub fn commit(&mut self) -> u32 {
        if self.dirty {
            self.revision += 1;
            self.undo.push(LogEntry::Commit { rev: self.revision });
            self.dirty = false;
            trace!(target: "state.undo", revision = self.revision, "commit");
        }
        self.revision
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Replay the topmost committed group from `src` to `dst` (§4.3
    /// `undo`/`redo`, which share this routine — see DESIGN.md for the
    /// kind-inversion rationale). Returns `false` if there is nothing to
    /// replay.
    fn undo_redo(&mut self, dir: UndoDir) -> bool {
        self.commit();
        let commit_rev = {
            let src = match dir {
                UndoDir::Undo => &mut self.undo,
                UndoDir::Redo => &mut self.redo,
            };
            match src.pop() {
                Some(LogEntry::Commit { rev }) => rev,
                Some(other) => {
                    src.push(other);
                    return false;
                }
                None => return false,
            }
        };
        let mut mirrored = Vec::new();
        loop {
            let popped = {
                let src = match dir {
                    UndoDir::Undo => &mut self.undo,
                    UndoDir::Redo => &mut self.redo,
                };
                match src.last() {
                    Some(LogEntry::Commit { .. }) | None => None,
                    _ => src.pop(),
                }
            };
            match popped {
                None => break,
                Some(entry) => mirrored.push(self.replay_entry(entry)),
            }
        }
        let dst = match dir {
            UndoDir::Undo => &mut self.redo,
            UndoDir::Redo => &mut self.undo,
        };
        for m in mirrored {
            dst.push(m);
        }
        dst.push(LogEntry::Commit { rev: commit_rev });
        self.revision = match dir {
            // Undoing: the new current revision is whatever commit is now
            // on top of the undo log (the group before the one undone).
            UndoDir::Undo => match self.undo.last() {
                Some(LogEntry::Commit { rev }) => *rev,
                _ => 0,
            },
            // Redoing restores exactly the revision that was current
            // before the undo that produced this redo-log group.
            UndoDir::Redo => commit_rev,
        };
        trace!(target: "state.undo", ?dir, revision = self.revision, "undo_redo");
        true
    }

    pub fn undo(&mut self) -> bool {
        self.undo_redo(UndoDir::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.undo_redo(UndoDir::Redo)
    }

    /// Replay one log entry against the buffer, inverting its kind for
    /// the opposite log (see module doc / DESIGN.md).
    fn replay_entry(&mut self, entry: LogEntry) -> LogEntry {
        match entry {
            LogEntry::Insert { p0, np } => {
                let mut deleted = Vec::with_capacity(np);
                for _ in 0..np {
                    deleted.push(self.buf.get(p0));
                    self.buf.del(p0);
                }
                deleted.reverse();
                self.marks.rebase_delete(p0, np);
                LogEntry::Delete { p0, np, runes: deleted }
            }
            LogEntry::Delete { p0, np, runes } => {
                let mut pos = p0;
                for &r in runes.iter().rev() {
                    self.buf.ins(pos, r);
                    pos += 1;
                }
                self.marks.rebase_insert(p0, np);
                LogEntry::Insert { p0, np }
            }
            LogEntry::Commit { .. } => unreachable!("commit entries are consumed by undo_redo"),
        }
    }

    // ---- marks, search, yank -------------------------------------------

    pub fn setmark(&mut self, name: Rune, pos: usize) {
        self.marks.set(name, pos);
    }

    pub fn getmark(&self, name: Rune) -> Option<usize> {
        self.marks.get(name)
    }

    pub fn look(&mut self, from: usize, pattern: &[Rune]) -> Option<usize> {
        self.buf.look(from, pattern)
    }

    /// Copy `[p0, p1)` into `ybuf`, resizing it up or down in
    /// `YANK_GROW`-rune increments toward a preferred capacity
    /// (`original_source/edit.c`'s `YankSize` growth policy).
    pub fn yank(&mut self, p0: usize, p1: usize, ybuf: &mut Vec<Rune>) {
        let needed = p1.saturating_sub(p0);
        let preferred = needed.div_ceil(YANK_GROW) * YANK_GROW;
        self.yank_cap_hint = preferred.max(YANK_GROW);
        if ybuf.capacity() < needed {
            let missing = self.yank_cap_hint.saturating_sub(ybuf.capacity());
            ybuf.reserve(missing);
        } else if ybuf.capacity() > self.yank_cap_hint * 2 {
            ybuf.shrink_to(self.yank_cap_hint);
        }
        self.buf.yank(p0, p1, ybuf);
    }

    // ---- file I/O (§4.3.3, §6.1, §7) ------------------------------------

    /// Load file contents fresh into this (assumed-empty) buffer.
    pub fn read_from_path(&mut self, path: &Path) -> Result<(), EditError> {
        let mut f = fs::File::open(path).map_err(|_| EditError::CannotOpenFile)?;
        let meta = f.metadata().map_err(|_| EditError::CannotOpenFile)?;
        self.read_from(&mut f).map_err(|_| EditError::CannotOpenFile)?;
        self.path = Some(path.to_path_buf());
        self.mtime = meta.modified().ok();
        self.commit();
        self.frev = self.revision;
        Ok(())
    }

    /// Append UTF-8 bytes from `r` until EOF (§4.3 `read`). Malformed or
    /// truncated trailing sequences become U+FFFD (§6.1).
    pub fn read_from<R: Read>(&mut self, r: &mut R) -> io::Result<usize> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Ok(self.ins_utf8(self.buf.len(), &bytes))
    }

    /// Write the whitespace-canonical rendering (§4.3.3) to `path`,
    /// refusing to clobber a file modified on disk since the last
    /// read/write of this buffer (§6.3 mtime guard).
    pub fn write_to_path(&mut self, path: &Path, guard_mtime: bool) -> Result<(), EditError> {
        if guard_mtime
            && self.path.as_deref() == Some(path)
            && let Some(known) = self.mtime
            && let Ok(meta) = fs::metadata(path)
            && let Ok(disk) = meta.modified()
            && disk > known
        {
            return Err(EditError::FileChangedOnDisk);
        }
        let mut f = fs::File::create(path).map_err(|_| EditError::CannotOpenFile)?;
        let limbo = self.buf.limbo();
        let buf = &mut self.buf;
        crate::writer::write_normalized(|i| buf.get(i), limbo, &mut f)
            .map_err(|_| EditError::CannotOpenFile)?;
        f.flush().ok();
        let meta = f.metadata().map_err(|_| EditError::CannotOpenFile)?;
        self.path = Some(path.to_path_buf());
        self.mtime = meta.modified().ok();
        self.frev = self.revision();
        debug!(target: "state.undo", path = %path.display(), revision = self.frev, "write");
        Ok(())
    }

    pub fn write(&mut self) -> Result<(), EditError> {
        let path = self.path.clone().ok_or(EditError::NoFileToWrite)?;
        self.write_to_path(&path, true)
    }

    // ---- async lifecycle (§4.3.4) ---------------------------------------

    /// Register an outstanding `Task`'s hold on this buffer. Must be
    /// balanced by `release_task_hold`.
    pub fn acquire_task_hold(&mut self) {
        self.active_holds += 1;
        if let Lifecycle::Zombie { remaining } = &mut self.lifecycle {
            *remaining += 1;
        }
    }

    /// Release a hold acquired by `acquire_task_hold`. Returns `true`
    /// when this was the last hold on a killed buffer, signalling the
    /// caller (the command layer's task table) that the `EBuf` may now
    /// be dropped.
    pub fn release_task_hold(&mut self) -> bool {
        debug_assert!(self.active_holds > 0, "unbalanced task hold release");
        self.active_holds = self.active_holds.saturating_sub(1);
        if let Lifecycle::Zombie { remaining } = &mut self.lifecycle {
            *remaining = remaining.saturating_sub(1);
            return *remaining == 0;
        }
        false
    }

    /// Kill this buffer (§4.3 `kill`). If no tasks are outstanding it is
    /// immediately freeable (the caller should drop it); otherwise it
    /// becomes a zombie that frees itself once every outstanding task
    /// releases its hold (§4.3.4).
    pub fn kill(&mut self) -> bool {
        match self.lifecycle {
            Lifecycle::Live => {
                let remaining = self.active_holds;
                self.lifecycle = Lifecycle::Zombie { remaining };
                remaining == 0
            }
            Lifecycle::Zombie { remaining } => remaining == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(e: &mut EBuf, s: &str) {
        for (i, ch) in s.chars().enumerate() {
            e.ins(i, ch as Rune);
        }
    }

    fn to_string(e: &mut EBuf) -> String {
        let len = e.buf().len();
        (0..len).map(|i| char::from_u32(e.buf_mut().get(i)).unwrap()).collect()
    }

    #[test]
    fn insert_and_undo_scenario() {
        // spec.md §8: ins(0,'h'); ins(1,'i'); commit(); undo() -> empty,
        // revision() returns the pre-change revision.
        let mut e = EBuf::new();
        e.ins(0, 'h' as Rune);
        e.ins(1, 'i' as Rune);
        e.commit();
        assert_eq!(e.revision(), 1);
        assert!(e.undo());
        assert_eq!(e.buf().len(), 0);
        assert_eq!(e.revision(), 0);
    }

    #[test]
    fn delete_with_coalesce_undo_restores_hello() {
        let mut e = EBuf::new();
        type_str(&mut e, "hello");
        e.commit();
        for pos in [4, 3, 2, 1, 0] {
            e.del(pos, pos + 1);
        }
        assert_eq!(e.buf().len(), 0);
        assert!(e.undo());
        assert_eq!(to_string(&mut e), "hello");
    }

    #[test]
    fn undo_then_redo_is_byte_identical_and_same_revision() {
        let mut e = EBuf::new();
        type_str(&mut e, "hello world");
        e.commit();
        let rev = e.revision();
        assert!(e.undo());
        assert_eq!(e.buf().len(), 0);
        assert!(e.redo());
        assert_eq!(to_string(&mut e), "hello world");
        assert_eq!(e.revision(), rev);
    }

    #[test]
    fn delete_range_then_undo_then_redo_roundtrips() {
        let mut e = EBuf::new();
        type_str(&mut e, "hello world");
        e.commit();
        e.del(5, 11); // delete " world"
        e.commit();
        assert_eq!(to_string(&mut e), "hello");
        assert!(e.undo());
        assert_eq!(to_string(&mut e), "hello world");
        assert!(e.redo());
        assert_eq!(to_string(&mut e), "hello");
    }

    #[test]
    fn mark_through_delete_scenario() {
        let mut e = EBuf::new();
        for i in 0..20 {
            e.ins(i, b'a' as Rune);
        }
        e.setmark('m' as Rune, 10);
        e.del(5, 15);
        assert_eq!(e.getmark('m' as Rune), Some(5));
    }

    #[test]
    fn commit_is_redundant_when_nothing_changed() {
        let mut e = EBuf::new();
        e.ins(0, 'x' as Rune);
        let r1 = e.commit();
        let r2 = e.commit();
        assert_eq!(r1, r2);
    }

    #[test]
    fn kill_with_no_tasks_frees_immediately() {
        let mut e = EBuf::new();
        assert!(e.kill());
        assert!(e.is_zombie());
    }

    #[test]
    fn kill_with_outstanding_task_waits_for_release() {
        let mut e = EBuf::new();
        e.acquire_task_hold();
        assert!(!e.kill());
        assert!(e.release_task_hold());
    }

    #[test]
    fn ins_utf8_decodes_multibyte() {
        let mut e = EBuf::new();
        let n = e.ins_utf8(0, "h\u{e9}llo".as_bytes());
        assert_eq!(n, 5);
        assert_eq!(to_string(&mut e), "h\u{e9}llo");
    }

    #[test]
    fn write_then_read_then_write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let mut e = EBuf::new();
        type_str(&mut e, "a  \n\nb \n\n");
        e.commit();
        e.write_to_path(&path, false).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, "a\n\nb\n");

        let mut e2 = EBuf::new();
        e2.read_from_path(&path).unwrap();
        e2.write_to_path(&path, false).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn write_refuses_when_file_changed_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let mut e = EBuf::new();
        type_str(&mut e, "hello");
        e.commit();
        e.write_to_path(&path, true).unwrap();
        // Simulate an external modification advancing mtime.
        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(&path, "changed externally").unwrap();
        e.ins(5, '!' as Rune);
        e.commit();
        let result = e.write_to_path(&path, true);
        assert!(matches!(result, Err(EditError::FileChangedOnDisk)));
    }
}
