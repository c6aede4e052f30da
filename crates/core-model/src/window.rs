//! A single text window: line table, scroll, hit-test (spec component C5,
//! spec.md §4.5).
//!
//! Grounded on `original_source/win.c`/`win.h`'s `struct w` (`start`,
//! `stop`, `cu`, per-window `GWin`), redesigned per spec.md §4.5 to
//! materialize the full line table `l[0..=nl]` up front (the original
//! recomputes wrapped-segment starts on demand via `lineinfo` every
//! redraw) so hit-testing and redraw share one up-to-date table instead
//! of re-walking the buffer from `start` each time.

use core_text::Rune;
use tracing::trace;

use crate::linelayout::{layout_line, lineinfo};
use crate::rect::Rect;

/// `win.h`'s `enum CursorLoc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorLoc {
    Top,
    Mid,
    Bot,
}

/// A per-window "tag" mini-buffer shown at the bottom of the window
/// (spec.md §4.5 `tag_toggle`), preseeded with a small command string.
#[derive(Debug, Clone)]
pub struct Tag {
    pub text: String,
    pub visible: bool,
}

impl Tag {
    fn new() -> Self {
        Tag { text: "Get Put Look New Del".to_string(), visible: false }
    }
}

#[derive(Debug, Clone)]
pub struct Window {
    pub rect: Rect,
    /// Width fraction within its frame, in `FSCALE` units (`win.c`'s
    /// `vfrac`).
    pub vfrac: u32,
    start: usize,
    stop: usize,
    cu: usize,
    /// Line table: `l[i]` is the buffer offset of the first rune of
    /// displayed screen line `i`, for `i` in `0..=nl`.
    l: Vec<usize>,
    layout_revision: Option<u32>,
    tag: Tag,
}

impl Window {
    pub fn new(rect: Rect, vfrac: u32) -> Self {
        Window { rect, vfrac, start: 0, stop: 0, cu: 0, l: vec![0], layout_revision: None, tag: Tag::new() }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn stop(&self) -> usize {
        self.stop
    }

    /// The full line table `l[0..=nl]` (spec.md §4.5), for callers that
    /// need more than the top/bottom offsets (redraw, property tests).
    pub fn line_table(&self) -> &[usize] {
        &self.l
    }

    pub fn cursor(&self) -> usize {
        self.cu
    }

    pub fn set_cursor(&mut self, pos: usize) {
        self.cu = pos;
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Whether `self.cu` currently falls within `[start, stop)` — the
    /// dispatcher checks this after a cursor move to decide whether a
    /// `show_cursor` scroll is needed (`original_source/win.c`'s `WIN_TEST`
    /// harness: `if (w->cu < w->start || w->cu >= w->stop) win_show_cursor(...)`).
    pub fn cursor_visible(&self) -> bool {
        self.cu >= self.start && self.cu < self.stop
    }

    /// Force a relayout on the next `ensure_layout` call, e.g. after a
    /// resize.
    pub fn mark_dirty(&mut self) {
        self.layout_revision = None;
    }

    /// Recompute the line table if the buffer's revision has advanced (or
    /// this is the first layout). `len` is the buffer's current live rune
    /// count, used to detect the "past end of content" case (spec.md
    /// §4.5.1: repeated `l[k] = l[k+1]` is only valid there).
    pub fn ensure_layout<G: FnMut(usize) -> Rune>(&mut self, get: G, len: usize, revision: u32) {
        if self.layout_revision == Some(revision) {
            return;
        }
        self.relayout(get, len);
        self.layout_revision = Some(revision);
    }

    fn relayout<G: FnMut(usize) -> Rune>(&mut self, mut get: G, len: usize) {
        let width_limit = self.rect.w.max(1);
        let nls = self.rect.h.max(1);
        let mut l = vec![self.start];
        let mut off = self.start;
        while l.len() <= nls {
            if off >= len {
                l.push(off);
                continue;
            }
            let mut cur_sl = 0usize;
            off = layout_line(&mut get, off, width_limit, |pos, _r, _c, _w, sl| {
                if sl != cur_sl {
                    cur_sl = sl;
                    l.push(pos);
                }
                l.len() <= nls
            });
        }
        self.stop = *l.last().expect("l always has at least one entry");
        self.l = l;
    }

    /// Buffer offset under the screen cell `(x, y)`, relative to this
    /// window's rect (spec.md §4.5 `at`): resolve `y` to a screen-line
    /// index via the line table, then walk runes accumulating widths
    /// until the `x` threshold is passed (`win.c`'s `line`/`drawfn`
    /// pattern run just far enough to answer one hit-test).
    pub fn at<G: FnMut(usize) -> Rune>(&self, mut get: G, x: usize, y: usize) -> usize {
        let sl = y.min(self.l.len().saturating_sub(2));
        let line_start = self.l[sl];
        let line_end = self.l.get(sl + 1).copied().unwrap_or(line_start);
        if line_start >= line_end {
            return line_start;
        }
        let width_limit = self.rect.w.max(1);
        let mut hit = line_start;
        layout_line(&mut get, line_start, width_limit, |pos, _r, col, rw, _sl| {
            if pos >= line_end {
                return false;
            }
            hit = pos;
            if col + rw > x {
                return false;
            }
            true
        });
        hit
    }

    /// Advance the top-of-window by `n` screen lines; negative scrolls
    /// backward (spec.md §4.5 `scroll`). Backward scroll resolves by
    /// finding the bol of the previous line and enumerating its wrapped
    /// segments to pick the correct earlier segment (`win.c`'s
    /// `win_scroll`).
    pub fn scroll<G: FnMut(usize) -> Rune, B: FnMut(usize) -> usize>(
        &mut self,
        mut get: G,
        mut bol: B,
        mut n: i64,
    ) {
        if n == 0 {
            return;
        }
        let width_limit = self.rect.w.max(1);
        if n < 0 {
            loop {
                if self.start == 0 || n == 0 {
                    break;
                }
                let line_bol = bol(self.start - 1);
                let ring = lineinfo(&mut get, line_bol, width_limit, Some(self.start - 1));
                let mut top = ring.len() as i64 - 2;
                while n < 0 && top >= 0 {
                    self.start = ring.get(top as usize);
                    top -= 1;
                    n += 1;
                }
            }
        } else {
            while n > 0 {
                let ring = lineinfo(&mut get, self.start, width_limit, None);
                let mut top = 1usize;
                while n > 0 && top < ring.len() {
                    self.start = ring.get(top);
                    top += 1;
                    n -= 1;
                }
            }
        }
        self.mark_dirty();
    }

    /// Scroll so the cursor appears at the requested screen region
    /// (spec.md §4.5 `show_cursor`; `win.c`'s `win_show_cursor`).
    pub fn show_cursor<G: FnMut(usize) -> Rune, B: FnMut(usize) -> usize>(
        &mut self,
        mut get: G,
        mut bol: B,
        where_: CursorLoc,
    ) {
        let width_limit = self.rect.w.max(1);
        let cu_bol = bol(self.cu);
        let ring = lineinfo(&mut get, cu_bol, width_limit, Some(self.cu));
        debug_assert!(ring.len() >= 2);
        self.start = ring.get(ring.len() - 2);
        self.mark_dirty();
        trace!(target: "model.window", cu = self.cu, start = self.start, ?where_, "show_cursor");
        match where_ {
            CursorLoc::Top => {}
            CursorLoc::Mid => {
                let half = (self.rect.h / 2) as i64;
                self.scroll(&mut get, &mut bol, -half);
            }
            CursorLoc::Bot => {
                let h = self.rect.h as i64;
                self.scroll(&mut get, &mut bol, -(h - 1));
            }
        }
    }

    /// Show/hide the per-window tag mini-buffer (spec.md §4.5 `tag_toggle`).
    pub fn tag_toggle(&mut self) {
        self.tag.visible = !self.tag.visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buf;

    fn filled(s: &str) -> Buf {
        let mut b = Buf::new();
        for (i, ch) in s.chars().enumerate() {
            b.ins(i, ch as Rune);
        }
        b
    }

    #[test]
    fn relayout_single_short_line() {
        let mut b = filled("hello\n");
        let mut w = Window::new(Rect::new(0, 0, 80, 5), 16384);
        w.ensure_layout(|i| b.get(i), b.len(), 1);
        assert_eq!(w.start(), 0);
        assert!(w.stop() >= 6);
    }

    #[test]
    fn relayout_pads_past_end_with_repeated_offsets() {
        let mut b = filled("hi\n");
        let mut w = Window::new(Rect::new(0, 0, 80, 10), 16384);
        w.ensure_layout(|i| b.get(i), b.len(), 1);
        // With only one short source line and 10 requested screen lines,
        // the tail of the line table should repeat the end-of-content
        // offset (the window is "partially empty").
        assert_eq!(w.stop(), b.len() + 1);
    }

    #[test]
    fn ensure_layout_is_noop_on_same_revision() {
        let mut b = filled("hello\n");
        let mut w = Window::new(Rect::new(0, 0, 80, 5), 16384);
        w.ensure_layout(|i| b.get(i), b.len(), 1);
        let stop_before = w.stop();
        w.set_cursor(3);
        w.ensure_layout(|_| panic!("must not relayout on unchanged revision"), b.len(), 1);
        assert_eq!(w.stop(), stop_before);
    }

    #[test]
    fn at_hits_first_column_on_empty_x() {
        let mut b = filled("hello\n");
        let mut w = Window::new(Rect::new(0, 0, 80, 5), 16384);
        w.ensure_layout(|i| b.get(i), b.len(), 1);
        assert_eq!(w.at(|i| b.get(i), 0, 0), 0);
    }

    #[test]
    fn scroll_forward_then_backward_returns_to_start() {
        let mut b = filled("a\nb\nc\nd\ne\n");
        let mut w = Window::new(Rect::new(0, 0, 80, 2), 16384);
        w.ensure_layout(|i| b.get(i), b.len(), 1);
        let original_start = w.start();
        w.scroll(|i| b.get(i), |p| b.bol(p), 2);
        assert!(w.start() > original_start);
        w.scroll(|i| b.get(i), |p| b.bol(p), -2);
        assert_eq!(w.start(), original_start);
    }

    #[test]
    fn tag_toggle_flips_visibility() {
        let mut w = Window::new(Rect::new(0, 0, 80, 5), 16384);
        assert!(!w.tag().visible);
        w.tag_toggle();
        assert!(w.tag().visible);
    }
}
