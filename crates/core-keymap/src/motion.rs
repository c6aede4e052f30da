//! Word/line motion predicates and cursor motions (spec.md §4.7 "Motions
//! include `h j k l w e W E b B 0 $`").
//!
//! Grounded on `original_source/cmd.c`'s `motion`/`mvnext`/`mvprev` and its
//! `risword`/`risbigword`/`risalpha`/`risascii` helpers, carried unchanged
//! in behavior per SPEC_FULL.md.

use core_text::{Buf, Rune};

pub fn risascii(r: Rune) -> bool {
    r <= '~' as Rune
}

/// "stupid home brewed latin detection", verbatim from `cmd.c`.
pub fn risalpha(r: Rune) -> bool {
    (risascii(r) && (r as u8 as char).is_alphabetic()) || (0xc0..0x100).contains(&r)
}

pub fn risbigword(r: Rune) -> bool {
    !risascii(r) || !(r as u8 as char).is_whitespace()
}

pub fn risword(r: Rune) -> bool {
    risalpha(r) || (r >= b'0' as Rune && r <= b'9' as Rune) || r == b'_' as Rune
}

/// A single cursor motion recognized by the parser (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Down,
    Up,
    Right,
    WordNext,
    WordEnd,
    BigWordNext,
    BigWordEnd,
    WordPrev,
    BigWordPrev,
    LineStart,
    LineEnd,
}

impl Motion {
    pub fn from_rune(r: Rune) -> Option<Motion> {
        match r as u8 as char {
            'h' => Some(Motion::Left),
            'j' => Some(Motion::Down),
            'k' => Some(Motion::Up),
            'l' | ' ' => Some(Motion::Right),
            'w' => Some(Motion::WordNext),
            'e' => Some(Motion::WordEnd),
            'W' => Some(Motion::BigWordNext),
            'E' => Some(Motion::BigWordEnd),
            'b' => Some(Motion::WordPrev),
            'B' => Some(Motion::BigWordPrev),
            '0' => Some(Motion::LineStart),
            '$' => Some(Motion::LineEnd),
            _ => None,
        }
    }

    /// Whether this motion operates line-wise for a pending operator
    /// (`cmd.c`'s `lw = "jk\'{}[]"`); no operator exists yet in this
    /// editing core, but the classification is kept for future use by the
    /// command layer.
    pub fn is_linewise(self) -> bool {
        matches!(self, Motion::Down | Motion::Up)
    }
}

/// Scan forward from `cu` by one word/big-word unit (`cmd.c`'s `mvnext`,
/// its priming no-op first loop pass collapsed away since it reads back
/// the same position it just primed from).
/// `end` selects "end of this/next word" (`e`/`E`) vs. "start of next
/// word" (`w`/`W`).
pub fn mvnext(b: &mut Buf, cu: usize, in_class: fn(Rune) -> bool, end: bool) -> usize {
    let off = end as usize;
    let mut pos = cu;
    let mut st = in_class(b.get(pos + off));
    let mut i = 0i32;
    loop {
        pos += 1;
        let nx = in_class(b.get(pos + off));
        i += (nx != st) as i32;
        st = nx;
        if !(i < 2 && (nx == end || i == 0)) {
            break;
        }
    }
    pos
}

/// Scan backward to the start of the previous word/big-word unit
/// (`cmd.c`'s `mvprev`).
pub fn mvprev(b: &mut Buf, mut cu: usize, in_class: fn(Rune) -> bool) -> usize {
    while cu > 0 && !in_class(b.get(cu - 1)) {
        cu -= 1;
    }
    while cu > 0 && in_class(b.get(cu - 1)) {
        cu -= 1;
    }
    cu
}

/// Apply `motion` `count` times starting from `cu` (`cmd.c`'s `motion`,
/// minus its `'`/`` ` `` mark-jump cases, which spec.md §4.7 does not
/// name as a C7 motion). Returns the new cursor offset.
pub fn apply(b: &mut Buf, cu: usize, motion: Motion, count: u32) -> usize {
    let count = count.max(1);
    let (line, col) = b.getlc(cu);
    match motion {
        Motion::Left => b.setlc(line, col.saturating_sub(count as usize)),
        Motion::Down => b.setlc(line + count as usize, col),
        Motion::Up => b.setlc(line.saturating_sub(count as usize), col),
        Motion::Right => b.setlc(line, col + count as usize),
        Motion::LineStart => b.setlc(line, 0),
        Motion::LineEnd => {
            let eol = b.eol(cu);
            if eol != cu { eol - 1 } else { cu }
        }
        Motion::WordNext => {
            let mut cu = cu;
            for _ in 0..count {
                cu = mvnext(b, cu, risword, false);
            }
            cu
        }
        Motion::WordEnd => {
            let mut cu = cu;
            for _ in 0..count {
                cu = mvnext(b, cu, risword, true);
            }
            cu
        }
        Motion::BigWordNext => {
            let mut cu = cu;
            for _ in 0..count {
                cu = mvnext(b, cu, risbigword, false);
            }
            cu
        }
        Motion::BigWordEnd => {
            let mut cu = cu;
            for _ in 0..count {
                cu = mvnext(b, cu, risbigword, true);
            }
            cu
        }
        Motion::WordPrev => {
            let mut cu = cu;
            for _ in 0..count {
                cu = mvprev(b, cu, risword);
            }
            cu
        }
        Motion::BigWordPrev => {
            let mut cu = cu;
            for _ in 0..count {
                cu = mvprev(b, cu, risbigword);
            }
            cu
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(s: &str) -> Buf {
        let mut b = Buf::new();
        for (i, ch) in s.chars().enumerate() {
            b.ins(i, ch as Rune);
        }
        b
    }

    #[test]
    fn word_next_skips_to_next_word_start() {
        let mut b = filled("the quick fox\n");
        let cu = apply(&mut b, 0, Motion::WordNext, 1);
        assert_eq!(cu, 4);
    }

    #[test]
    fn word_prev_returns_to_word_start() {
        let mut b = filled("the quick fox\n");
        let cu = apply(&mut b, 10, Motion::WordPrev, 1);
        assert_eq!(cu, 4);
    }

    #[test]
    fn line_start_and_end() {
        let mut b = filled("hello\nworld\n");
        let cu = apply(&mut b, 8, Motion::LineStart, 1);
        assert_eq!(cu, 6);
        let cu = apply(&mut b, 6, Motion::LineEnd, 1);
        assert_eq!(cu, 10);
    }

    #[test]
    fn down_and_up_preserve_column() {
        let mut b = filled("abc\nde\nfghi\n");
        let cu = apply(&mut b, 1, Motion::Down, 1); // 'b' -> line 1 col 1 -> 'e'
        assert_eq!(b.getlc(cu), (1, 1));
        let cu = apply(&mut b, cu, Motion::Up, 1);
        assert_eq!(b.getlc(cu), (0, 1));
    }

    #[test]
    fn risword_classifies_alnum_and_underscore() {
        assert!(risword(b'a' as Rune));
        assert!(risword(b'9' as Rune));
        assert!(risword(b'_' as Rune));
        assert!(!risword(b' ' as Rune));
    }

    #[test]
    fn risbigword_excludes_whitespace_only() {
        assert!(risbigword(b'.' as Rune));
        assert!(!risbigword(b' ' as Rune));
        assert!(!risbigword(b'\t' as Rune));
    }
}
