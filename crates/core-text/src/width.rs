//! Rune display width, consulted by the windowing layer (C5) when wrapping
//! and laying out screen columns. Grounded on the donor's `unicode-width`
//! usage (`core-text/src/width.rs` in the donor measured grapheme
//! clusters; here it measures single runes, since this buffer is
//! rune-indexed rather than grapheme-indexed per spec.md §3).

use crate::rune::Rune;
use unicode_width::UnicodeWidthChar;

/// Display width in terminal columns of a single rune. Control characters
/// and unrepresentable scalars report width 1 so layout never stalls on
/// zero-width runs it cannot otherwise advance past.
pub fn rune_width(r: Rune) -> usize {
    match char::from_u32(r) {
        Some(c) => UnicodeWidthChar::width(c).unwrap_or(1),
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_width_one() {
        assert_eq!(rune_width('a' as Rune), 1);
    }

    #[test]
    fn wide_cjk_is_width_two() {
        assert_eq!(rune_width('\u{4e2d}' as Rune), 2);
    }

    #[test]
    fn combining_mark_is_width_zero() {
        assert_eq!(rune_width('\u{0301}' as Rune), 0);
    }
}
