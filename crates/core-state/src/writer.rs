//! Whitespace-canonical writer (spec.md §4.3.3, §6.1).
//!
//! A streaming two-state filter (Munching/Spitting) over the rune sequence
//! up to `limbo`, grounded on `original_source/edit.c`'s `putfile` munch
//! loop. Munching buffers a run of spaces/tabs (`ws_buf`, verbatim,
//! in case it turns out to be leading indentation) and a run count of
//! newlines (`nl_count`, deferred so a trailing run at end-of-file can be
//! collapsed to exactly one `'\n'` without unbounded lookahead). A
//! newline clears `ws_buf` (the spaces it followed were trailing, so they
//! are dropped) and extends `nl_count`. Non-whitespace content flushes
//! `nl_count` newlines verbatim, then `ws_buf` verbatim, preserving both
//! inter-line blank runs and in-line/leading whitespace exactly while
//! dropping only whitespace that sat directly before a newline.

use core_text::{Rune, encode};
use std::io::{self, Write};

fn is_hspace(r: Rune) -> bool {
    r == b' ' as Rune || r == b'\t' as Rune
}

/// Write runes `0..limit` from `get` through the whitespace-canonical
/// filter into `out`, encoding each rune as UTF-8.
pub fn write_normalized<F: FnMut(usize) -> Rune, W: Write>(
    mut get: F,
    limit: usize,
    out: &mut W,
) -> io::Result<()> {
    let mut ws_buf: Vec<Rune> = Vec::new();
    let mut nl_count: usize = 0;
    let mut content_emitted = false;
    let mut enc = [0u8; 4];

    let mut emit_rune = |out: &mut W, r: Rune, enc: &mut [u8; 4]| -> io::Result<()> {
        let n = encode(r, enc);
        out.write_all(&enc[..n])
    };

    for i in 0..limit {
        let r = get(i);
        if r == b'\n' as Rune {
            ws_buf.clear();
            nl_count += 1;
        } else if is_hspace(r) {
            ws_buf.push(r);
        } else {
            for _ in 0..nl_count {
                emit_rune(out, b'\n' as Rune, &mut enc)?;
            }
            nl_count = 0;
            for w in ws_buf.drain(..) {
                emit_rune(out, w, &mut enc)?;
            }
            emit_rune(out, r, &mut enc)?;
            content_emitted = true;
        }
    }
    if nl_count > 0 || content_emitted {
        emit_rune(out, b'\n' as Rune, &mut enc)?;
    }
    Ok(())
}
