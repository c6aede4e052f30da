//! Paged gap buffer (spec component C2).
//!
//! A `Buf` is a doubly-linked list of `Page`s addressed by stable indices
//! into an arena (per §9's "vector of pages addressed by stable indices"
//! guidance, replacing the original's raw pointer list). Each page holds a
//! fixed-capacity rune array with an in-page gap so that local edits near
//! one cursor position are cheap.
//!
//! Grounded on `original_source/buf.c`'s `Page`/`Buf` structs and
//! `ins`/`del`/`newpage`/`setcol`/`setnl` statics, generalized per
//! spec.md §4.2 (including the corrected `fixcol`-propagation rule; the
//! original's known bug there is not reproduced — see SPEC_FULL.md).

use crate::rune::{NEWLINE, Rune};
use tracing::trace;

/// Production page capacity (spec.md §3: "≈1016 runes"; rounded to a power
/// of two for arena-friendly sizing).
pub const PAGE_CAPACITY: usize = 1024;

type PageIdx = usize;

#[derive(Debug, Clone)]
struct Page {
    /// Fixed-size backing array; only `len` slots hold live runes.
    buf: Vec<Rune>,
    /// Number of live runes in this page.
    len: usize,
    /// Start offset of the gap within `buf`. Live runes occupy
    /// `buf[..hbeg]` and `buf[hbeg + (cap - len)..]`.
    hbeg: usize,
    /// Count of `'\n'` runes among this page's live runes.
    nl: usize,
    /// Column of this page's first rune, assuming the predecessor page's
    /// `col`/`nl` are correct. Zero for the head page.
    col: usize,
    prev: Option<PageIdx>,
    next: Option<PageIdx>,
}

impl Page {
    fn empty(cap: usize) -> Self {
        Page {
            buf: vec![0; cap],
            len: 0,
            hbeg: 0,
            nl: 0,
            col: 0,
            prev: None,
            next: None,
        }
    }

    fn cap(&self) -> usize {
        self.buf.len()
    }

    fn gap_len(&self) -> usize {
        self.cap() - self.len
    }

    /// Map a logical in-page index (0..len) to its physical slot.
    fn phys(&self, logical: usize) -> usize {
        if logical < self.hbeg {
            logical
        } else {
            logical + self.gap_len()
        }
    }

    fn get(&self, logical: usize) -> Rune {
        self.buf[self.phys(logical)]
    }

    fn is_full(&self) -> bool {
        self.len == self.cap()
    }

    /// Slide the gap so its left edge sits at `target` (a logical index in
    /// `0..=len`).
    fn move_gap_to(&mut self, target: usize) {
        debug_assert!(target <= self.len);
        if target == self.hbeg {
            return;
        }
        let gap = self.gap_len();
        if target < self.hbeg {
            let n = self.hbeg - target;
            for i in (0..n).rev() {
                let src = target + i;
                let dst = target + gap + i;
                self.buf[dst] = self.buf[src];
            }
        } else {
            let n = target - self.hbeg;
            for i in 0..n {
                let src = self.hbeg + gap + i;
                let dst = self.hbeg + i;
                self.buf[dst] = self.buf[src];
            }
        }
        self.hbeg = target;
    }

    /// Insert `r` at logical index `target`. Caller must ensure the page
    /// is not full.
    fn insert(&mut self, target: usize, r: Rune) {
        debug_assert!(!self.is_full());
        self.move_gap_to(target);
        self.buf[self.hbeg] = r;
        self.hbeg += 1;
        self.len += 1;
        if r == NEWLINE {
            self.nl += 1;
        }
    }

    /// Delete the rune at logical index `target`, returning it.
    fn delete(&mut self, target: usize) -> Rune {
        debug_assert!(target < self.len);
        self.move_gap_to(target);
        let gap = self.gap_len();
        let r = self.buf[self.hbeg + gap];
        if r == NEWLINE {
            self.nl -= 1;
        }
        self.len -= 1;
        r
    }

    fn recompute_nl(&mut self) {
        self.nl = (0..self.len).filter(|&i| self.get(i) == NEWLINE).count();
    }
}

/// The paged gap buffer. Offsets are flat rune indices over the whole
/// buffer, counting only live runes (the gap is never visible).
#[derive(Debug, Clone)]
pub struct Buf {
    pages: Vec<Option<Page>>,
    free: Vec<PageIdx>,
    head: PageIdx,
    /// Cached `(page, absolute offset of that page's first rune)`.
    cache_page: PageIdx,
    cache_off: usize,
    /// Total live rune count across all pages.
    len: usize,
    /// Logical reservation watermark (§4.2).
    limbo: usize,
}

impl Default for Buf {
    fn default() -> Self {
        Self::new()
    }
}

impl Buf {
    pub fn new() -> Self {
        Self::with_page_capacity(PAGE_CAPACITY)
    }

    /// Construct with a non-default page capacity — used by tests that
    /// need to exercise page splitting/freeing without allocating
    /// thousands of runes.
    pub fn with_page_capacity(cap: usize) -> Self {
        let head = Page::empty(cap.max(1));
        Buf {
            pages: vec![Some(head)],
            free: Vec::new(),
            head: 0,
            cache_page: 0,
            cache_off: 0,
            len: 0,
            limbo: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn limbo(&self) -> usize {
        self.limbo
    }

    /// Drop all pages and reinitialize to a single empty page (§4.2 `clr`).
    pub fn clr(&mut self) {
        let cap = self.pages[self.head].as_ref().unwrap().cap();
        self.pages.clear();
        self.free.clear();
        self.pages.push(Some(Page::empty(cap)));
        self.head = 0;
        self.cache_page = 0;
        self.cache_off = 0;
        self.len = 0;
        self.limbo = 0;
    }

    fn page(&self, idx: PageIdx) -> &Page {
        self.pages[idx].as_ref().expect("dangling page index")
    }

    fn page_mut(&mut self, idx: PageIdx) -> &mut Page {
        self.pages[idx].as_mut().expect("dangling page index")
    }

    fn alloc_page(&mut self, p: Page) -> PageIdx {
        if let Some(idx) = self.free.pop() {
            self.pages[idx] = Some(p);
            idx
        } else {
            self.pages.push(Some(p));
            self.pages.len() - 1
        }
    }

    fn free_page(&mut self, idx: PageIdx) {
        self.pages[idx] = None;
        self.free.push(idx);
    }

    /// Locate the page containing flat offset `pos`, sliding the cached
    /// locator forward or backward as needed. `pos` may equal `self.len`
    /// (append position), in which case the last page and its `len` are
    /// returned.
    fn locate(&mut self, pos: usize) -> (PageIdx, usize) {
        debug_assert!(pos <= self.len);
        loop {
            let off = self.cache_off;
            let plen = self.page(self.cache_page).len;
            if pos < off {
                let prev = self.page(self.cache_page).prev.expect("pos before head page");
                let prev_len = self.page(prev).len;
                self.cache_page = prev;
                self.cache_off -= prev_len;
                continue;
            }
            if pos > off + plen {
                let next = self.page(self.cache_page).next;
                match next {
                    Some(n) => {
                        self.cache_off += plen;
                        self.cache_page = n;
                        continue;
                    }
                    None => return (self.cache_page, plen),
                }
            }
            if pos == off + plen {
                // Prefer staying in this page (append) unless a next page
                // exists and pos also equals its start (always true) — the
                // canonical position for offset `off+plen` is the end of
                // the current page.
                return (self.cache_page, plen);
            }
            return (self.cache_page, pos - off);
        }
    }

    pub fn get(&mut self, pos: usize) -> Rune {
        if pos >= self.len {
            return NEWLINE;
        }
        let (idx, local) = self.locate(pos);
        self.page(idx).get(local)
    }

    /// Insert `r` at `pos`, auto-extending with newlines if `pos` lies
    /// beyond `limbo` (§4.2).
    pub fn ins(&mut self, pos: usize, r: Rune) {
        if pos > self.limbo {
            while self.limbo < pos {
                self.ins_raw(self.limbo, NEWLINE);
                self.limbo += 1;
            }
        }
        self.ins_raw(pos, r);
        self.limbo = self.limbo.max(pos) + 1;
    }

    fn ins_raw(&mut self, pos: usize, r: Rune) {
        let (idx, local) = self.locate(pos);
        if self.page(idx).is_full() {
            let new_idx = self.split_page(idx);
            let (idx2, local2) = self.locate(pos);
            debug_assert!(idx2 == idx || idx2 == new_idx);
            self.page_mut(idx2).insert(local2, r);
        } else {
            self.page_mut(idx).insert(local, r);
        }
        self.len += 1;
        self.propagate_col(idx);
        trace!(target: "text.buf", pos, len = self.len, "ins");
    }

    /// Delete the rune at `pos` if it lies within the reserved region,
    /// otherwise simply retract the watermark (§4.2).
    pub fn del(&mut self, pos: usize) {
        if pos < self.limbo {
            self.del_raw(pos);
            self.limbo -= 1;
        } else if self.limbo > 0 {
            self.limbo -= 1;
        }
    }

    fn del_raw(&mut self, pos: usize) -> Rune {
        let (idx, local) = self.locate(pos);
        let r = self.page_mut(idx).delete(local);
        self.len -= 1;
        let next = self.page(idx).next;
        let prev = self.page(idx).prev;
        if self.page(idx).len == 0 && (prev.is_some() || next.is_some()) {
            self.unlink_and_free(idx);
            if let Some(p) = prev {
                self.propagate_col(p);
            } else if let Some(n) = next {
                self.propagate_col(n);
            }
        } else {
            self.propagate_col(idx);
        }
        trace!(target: "text.buf", pos, len = self.len, "del");
        r
    }

    fn unlink_and_free(&mut self, idx: PageIdx) {
        debug_assert_eq!(self.page(idx).len, 0);
        let prev = self.page(idx).prev;
        let next = self.page(idx).next;
        if let Some(p) = prev {
            self.page_mut(p).next = next;
        } else {
            self.head = next.expect("deleting the sole remaining page");
        }
        if let Some(n) = next {
            self.page_mut(n).prev = prev;
        }
        // `idx` is the page the cached locator last pointed at (we just
        // deleted through it), so `cache_off` is its absolute start.
        debug_assert_eq!(self.cache_page, idx);
        match prev {
            Some(p) => {
                let prev_len = self.page(p).len;
                self.cache_page = p;
                self.cache_off -= prev_len;
            }
            None => {
                // idx was the head and had zero live runes; next starts at
                // the same absolute offset idx did.
                self.cache_page = next.expect("unlinking the sole page");
            }
        }
        self.free_page(idx);
    }

    /// Split a full page in half, inserting the new page right after it.
    /// Returns the index of the new (right-hand) page.
    fn split_page(&mut self, idx: PageIdx) -> PageIdx {
        let cap;
        let mid;
        let right_runes: Vec<Rune>;
        let old_next;
        let col;
        {
            let page = self.page(idx);
            cap = page.cap();
            mid = page.len / 2;
            right_runes = (mid..page.len).map(|i| page.get(i)).collect();
            old_next = page.next;
            col = page.col;
        }
        {
            let page = self.page_mut(idx);
            let mut left = vec![0; cap];
            for i in 0..mid {
                left[i] = page.get(i);
            }
            page.buf = left;
            page.hbeg = mid;
            page.len = mid;
            page.col = col;
            page.recompute_nl();
        }
        let mut right = Page::empty(cap);
        for (i, r) in right_runes.iter().enumerate() {
            right.buf[i] = *r;
        }
        right.len = right_runes.len();
        right.hbeg = right.len;
        right.recompute_nl();
        right.prev = Some(idx);
        right.next = old_next;
        let new_idx = self.alloc_page(right);
        if let Some(n) = old_next {
            self.page_mut(n).prev = Some(new_idx);
        }
        self.page_mut(idx).next = Some(new_idx);
        self.recompute_col(new_idx);
        new_idx
    }

    /// Recompute `col` for `idx` from its predecessor, matching §4.2's
    /// propagation rule: the first page whose own live content contains a
    /// newline needs no forward propagation beyond it (its own `col`
    /// suffices for everything after that newline), so propagation stops
    /// there.
    fn propagate_col(&mut self, idx: PageIdx) {
        self.recompute_col(idx);
        let mut cur = idx;
        loop {
            let nl_beyond_first = self.page(cur).nl > 0;
            let next = self.page(cur).next;
            match next {
                None => break,
                Some(n) => {
                    self.recompute_col(n);
                    if nl_beyond_first {
                        break;
                    }
                    cur = n;
                }
            }
        }
    }

    fn recompute_col(&mut self, idx: PageIdx) {
        let prev = self.page(idx).prev;
        let col = match prev {
            None => 0,
            Some(p) => {
                let pg = self.page(p);
                if pg.nl > 0 {
                    // column after the last newline in the predecessor.
                    let mut c = 0usize;
                    for i in (0..pg.len).rev() {
                        if pg.get(i) == NEWLINE {
                            break;
                        }
                        c += 1;
                    }
                    c
                } else {
                    pg.col + pg.len
                }
            }
        };
        self.page_mut(idx).col = col;
    }

    /// First offset of the line containing `pos`.
    pub fn bol(&mut self, pos: usize) -> usize {
        let mut p = pos.min(self.len);
        while p > 0 && self.get(p - 1) != NEWLINE {
            p -= 1;
        }
        p
    }

    /// Last offset on the line containing `pos` (the offset of its
    /// terminating `'\n'`, or the virtual end).
    pub fn eol(&mut self, pos: usize) -> usize {
        let mut p = pos;
        while self.get(p) != NEWLINE {
            p += 1;
        }
        p
    }

    /// Translate a flat offset to (line, col), both 0-based.
    pub fn getlc(&mut self, pos: usize) -> (usize, usize) {
        let pos = pos.min(self.len);
        let bol = self.bol(pos);
        let col = pos - bol;
        let mut line = 0usize;
        let mut off = 0usize;
        let mut idx = self.head;
        loop {
            let plen = self.page(idx).len;
            if bol < off + plen || self.page(idx).next.is_none() {
                let local_bol = bol - off;
                for i in 0..local_bol {
                    if self.page(idx).get(i) == NEWLINE {
                        line += 1;
                    }
                }
                break;
            }
            line += self.page(idx).nl;
            off += plen;
            idx = self.page(idx).next.unwrap();
        }
        (line, col)
    }

    /// Translate (line, col) to a flat offset, clamping `col` to the
    /// line's length.
    pub fn setlc(&mut self, line: usize, col: usize) -> usize {
        // Walk newline-by-newline to the requested line's start.
        let mut pos = 0usize;
        let mut cur_line = 0usize;
        while cur_line < line {
            if pos >= self.len {
                break;
            }
            pos = self.eol(pos);
            if pos >= self.len {
                break;
            }
            pos += 1; // step past the newline
            cur_line += 1;
        }
        let bol = pos;
        let eol = self.eol(bol);
        (bol + col).min(eol)
    }

    /// Copy `[p0, p1)` into `out`.
    pub fn yank(&mut self, p0: usize, p1: usize, out: &mut Vec<Rune>) {
        out.clear();
        out.reserve(p1.saturating_sub(p0));
        for i in p0..p1 {
            out.push(self.get(i));
        }
    }

    /// Linear forward search for `pattern` starting at `from`.
    pub fn look(&mut self, from: usize, pattern: &[Rune]) -> Option<usize> {
        if pattern.is_empty() || from + pattern.len() > self.len {
            return None;
        }
        'outer: for start in from..=(self.len - pattern.len()) {
            for (i, &pr) in pattern.iter().enumerate() {
                if self.get(start + i) != pr {
                    continue 'outer;
                }
            }
            return Some(start);
        }
        None
    }

    /// Debug/test invariant check matching spec.md §8 property 3.
    #[cfg(test)]
    fn check_invariants(&mut self) {
        let mut total = 0usize;
        let mut idx = self.head;
        loop {
            let page = self.page(idx).clone();
            total += page.len;
            let actual_nl = (0..page.len).filter(|&i| page.get(i) == NEWLINE).count();
            assert_eq!(page.nl, actual_nl, "page nl mismatch at {idx}");
            match page.next {
                Some(n) => idx = n,
                None => break,
            }
        }
        assert_eq!(total, self.len, "page length sum mismatch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(b: &mut Buf, s: &str) {
        for (i, ch) in s.chars().enumerate() {
            b.ins(i, ch as Rune);
        }
    }

    fn to_string(b: &mut Buf) -> String {
        (0..b.len()).map(|i| char::from_u32(b.get(i)).unwrap()).collect()
    }

    #[test]
    fn insert_and_read_back() {
        let mut b = Buf::new();
        type_str(&mut b, "hello");
        assert_eq!(to_string(&mut b), "hello");
        b.check_invariants();
    }

    #[test]
    fn get_past_end_is_newline() {
        let mut b = Buf::new();
        type_str(&mut b, "hi");
        assert_eq!(b.get(2), NEWLINE);
        assert_eq!(b.get(100), NEWLINE);
    }

    #[test]
    fn limbo_extension_scenario() {
        let mut b = Buf::new();
        b.ins(5, 'x' as Rune);
        for i in 0..5 {
            assert_eq!(b.get(i), NEWLINE);
        }
        assert_eq!(b.get(5), 'x' as Rune);
        assert_eq!(b.limbo(), 6);
    }

    #[test]
    fn delete_with_coalesce_then_empty() {
        let mut b = Buf::new();
        type_str(&mut b, "hello");
        for pos in [4, 3, 2, 1, 0] {
            b.del(pos);
        }
        assert_eq!(b.len(), 0);
        assert_eq!(b.limbo(), 0);
    }

    #[test]
    fn page_split_under_tiny_capacity() {
        let mut b = Buf::with_page_capacity(4);
        type_str(&mut b, "abcdefghij");
        assert_eq!(to_string(&mut b), "abcdefghij");
        b.check_invariants();
    }

    #[test]
    fn page_merge_on_delete_under_tiny_capacity() {
        let mut b = Buf::with_page_capacity(4);
        type_str(&mut b, "abcdefghij");
        for _ in 0..10 {
            b.del(0);
        }
        assert_eq!(b.len(), 0);
        b.check_invariants();
    }

    #[test]
    fn getlc_setlc_roundtrip() {
        let mut b = Buf::new();
        type_str(&mut b, "ab\ncde\nf");
        for line in 0..3 {
            let col_max = match line {
                0 => 2,
                1 => 3,
                _ => 1,
            };
            for col in 0..col_max {
                let pos = b.setlc(line, col);
                assert_eq!(b.getlc(pos), (line, col));
            }
        }
    }

    #[test]
    fn setlc_clamps_to_line_length() {
        let mut b = Buf::new();
        type_str(&mut b, "ab\ncde\n");
        let pos = b.setlc(0, 99);
        assert_eq!(b.getlc(pos), (0, 2));
    }

    #[test]
    fn bol_eol_basic() {
        let mut b = Buf::new();
        type_str(&mut b, "ab\ncde\n");
        assert_eq!(b.bol(5), 3);
        assert_eq!(b.eol(4), 6);
        assert_eq!(b.bol(0), 0);
    }

    #[test]
    fn look_finds_substring() {
        let mut b = Buf::new();
        type_str(&mut b, "the quick fox");
        let pat: Vec<Rune> = "quick".chars().map(|c| c as Rune).collect();
        assert_eq!(b.look(0, &pat), Some(4));
        let pat2: Vec<Rune> = "zzz".chars().map(|c| c as Rune).collect();
        assert_eq!(b.look(0, &pat2), None);
    }

    #[test]
    fn clr_resets_to_empty() {
        let mut b = Buf::new();
        type_str(&mut b, "hello");
        b.clr();
        assert_eq!(b.len(), 0);
        assert_eq!(b.limbo(), 0);
        assert_eq!(b.get(0), NEWLINE);
    }

    #[test]
    fn yank_copies_range() {
        let mut b = Buf::new();
        type_str(&mut b, "hello world");
        let mut out = Vec::new();
        b.yank(6, 11, &mut out);
        let s: String = out.iter().map(|&r| char::from_u32(r).unwrap()).collect();
        assert_eq!(s, "world");
    }
}
