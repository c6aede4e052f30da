//! Property-based tests for line layout invariants (spec.md §4.5.1).

use core_model::{FSCALE, Rect, Window, layout_line};
use core_text::{NEWLINE, Rune};
use proptest::prelude::*;

fn getter(v: &[Rune]) -> impl FnMut(usize) -> Rune + '_ {
    move |i| if i < v.len() { v[i] } else { NEWLINE }
}

fn runes_from(s: &str) -> Vec<Rune> {
    s.chars().map(|c| c as Rune).collect()
}

proptest! {
    // layout_line always makes forward progress and never revisits an
    // earlier offset, regardless of content or wrap width.
    #[test]
    fn layout_line_always_advances(s in "[a-zA-Z0-9 \t]{0,40}", width in 1usize..30) {
        let mut v = runes_from(&s);
        v.push(NEWLINE);
        let mut visited = Vec::new();
        let end = layout_line(getter(&v), 0, width, |pos, _r, _c, _w, _sl| {
            visited.push(pos);
            true
        });
        prop_assert!(end > 0);
        for pair in visited.windows(2) {
            prop_assert!(pair[1] > pair[0]);
        }
    }

    // A window's line table is monotone non-decreasing end to end
    // (spec.md §4.5.1: equal neighbors are allowed only past content end).
    #[test]
    fn relayout_line_table_is_monotone(s in "[a-zA-Z0-9 \t\n]{0,60}", width in 1usize..20, height in 1usize..8) {
        let mut v = runes_from(&s);
        v.push(NEWLINE);
        let len = v.len();
        let mut w = Window::new(Rect::new(0, 0, width, height), FSCALE);
        w.ensure_layout(getter(&v), len, 1);
        for pair in w.line_table().windows(2) {
            prop_assert!(pair[1] >= pair[0]);
        }
    }
}
