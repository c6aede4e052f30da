//! Undo/redo log (spec.md §3 "Log entry", §4.3.1 "Log coalescing").
//!
//! Grounded on `original_source/edit.c`'s `Log`/`Undo` stack and `logins`/
//! `logdel`/`undo` statics, generalized per §9's "represent each entry as a
//! tagged variant; Delete holds a small inline buffer... plus overflow
//! linkage" guidance (here: a plain `Vec<Rune>`, since arena-style overflow
//! linkage buys nothing once the C flexible-array-member constraint is
//! gone).
//!
//! Resolved ambiguity (see DESIGN.md): §4.3's prose says replaying an
//! Insert entry is "recorded as an Insert on the opposite log" and a
//! Delete entry "recorded as a Delete on the opposite log". Taken
//! literally that loses the replayed runes and cannot satisfy the
//! round-trip invariant (§8 property 2), since §3's data model gives
//! Insert entries no rune payload at all. The kind is inverted instead:
//! undoing an Insert deletes it from the buffer and must remember what it
//! deleted, so it is recorded as a Delete entry (with payload); undoing a
//! Delete re-inserts its stored runes, which need no payload, so it is
//! recorded as an Insert entry. This is self-dual: replaying the mirrored
//! entry later (on redo, or a further undo) reproduces the original edit.

use core_text::Rune;

/// Maximum inline rune run per Delete entry (`original_source/edit.c`'s
/// `MaxBuf`). Longer deletions split into multiple coalescing entries.
pub const MAX_DELETE_RUN: usize = 4;

#[derive(Debug, Clone)]
pub enum LogEntry {
    /// `[p0, p0+np)` was inserted; the buffer still holds those runes, so no
    /// payload is carried.
    Insert { p0: usize, np: usize },
    /// `[p0, p0+np)` was deleted. `runes` holds the deleted runes in
    /// *reverse* buffer order (the rune at the highest original offset is
    /// `runes[0]`), since runes are pulled off the right edge of a shrinking
    /// range as deletion proceeds leftward.
    Delete { p0: usize, np: usize, runes: Vec<Rune> },
    /// Sentinel separating undoable groups, carrying the revision number
    /// open at the time it was pushed.
    Commit { rev: u32 },
}

/// Append an Insert(p0, 1) onto `log`, coalescing with the top entry when
/// the new rune extends it (§4.3.1: "Insert coalesces when the new range
/// starts at the end of the top Insert range").
pub fn log_insert(log: &mut Vec<LogEntry>, p0: usize, np: usize) {
    if let Some(LogEntry::Insert { p0: tp0, np: tnp }) = log.last_mut()
        && *tp0 + *tnp == p0
    {
        *tnp += np;
        return;
    }
    log.push(LogEntry::Insert { p0, np });
}

/// Record one deleted rune at `pos` (the left edge of the shrinking
/// deletion range) onto `log`, coalescing with the top Delete entry when
/// contiguous and under `MAX_DELETE_RUN` (§4.3.1: "Delete coalesces when
/// the new range ends at the beginning of the top Delete's[p0]").
pub fn log_delete_rune(log: &mut Vec<LogEntry>, pos: usize, r: Rune) {
    if let Some(LogEntry::Delete { p0, np, runes }) = log.last_mut()
        && *p0 == pos + 1
        && *np < MAX_DELETE_RUN
    {
        *p0 = pos;
        *np += 1;
        runes.push(r);
        return;
    }
    log.push(LogEntry::Delete { p0: pos, np: 1, runes: vec![r] });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_coalesces_when_contiguous() {
        let mut log = Vec::new();
        log_insert(&mut log, 0, 1);
        log_insert(&mut log, 1, 1);
        log_insert(&mut log, 2, 1);
        assert_eq!(log.len(), 1);
        assert!(matches!(log[0], LogEntry::Insert { p0: 0, np: 3 }));
    }

    #[test]
    fn insert_breaks_when_not_contiguous() {
        let mut log = Vec::new();
        log_insert(&mut log, 0, 1);
        log_insert(&mut log, 5, 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn delete_coalesces_leftward_until_max_run() {
        let mut log = Vec::new();
        for pos in [4, 3, 2, 1] {
            log_delete_rune(&mut log, pos, b'x' as Rune);
        }
        assert_eq!(log.len(), 1);
        match &log[0] {
            LogEntry::Delete { p0, np, runes } => {
                assert_eq!(*p0, 1);
                assert_eq!(*np, 4);
                assert_eq!(runes.len(), 4);
            }
            _ => panic!("expected Delete"),
        }
        // a 5th contiguous rune exceeds MAX_DELETE_RUN, starting a new entry.
        log_delete_rune(&mut log, 0, b'h' as Rune);
        assert_eq!(log.len(), 2);
    }
}
