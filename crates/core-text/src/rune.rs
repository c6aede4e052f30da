//! UTF-8 codec over 32-bit code points (spec component C1).
//!
//! The codec never allocates: callers supply the output buffer for
//! `encode` and the input slice for `decode`.

/// A Unicode scalar value, or a sentinel with the high bit set.
pub type Rune = u32;

/// Sentinel meaning "no rune here" — distinct from any valid scalar value.
pub const NORUNE: Rune = 0x8000_0000;

/// Replacement character emitted for malformed input (U+FFFD).
pub const WRONGRUNE: Rune = 0xFFFD;

/// The rune produced by reads past a buffer's logical end, and inserted
/// by limbo auto-extension (§4.2).
pub const NEWLINE: Rune = b'\n' as Rune;

#[inline]
pub fn risascii(r: Rune) -> bool {
    r < 0x7f
}

/// Encoded length in bytes of a scalar value. Values above `0x10FFFF` or in
/// the surrogate range are treated as malformed and report the same length
/// `WRONGRUNE` itself would (3 bytes), since callers never feed those
/// through `rune_len` for real encoding — only `encode`/`decode` validate.
pub fn rune_len(r: Rune) -> usize {
    if r < 0x80 {
        1
    } else if r < 0x800 {
        2
    } else if r < 0x1_0000 {
        3
    } else {
        4
    }
}

/// Encode `r` into `out`, returning the number of bytes written. Returns 0
/// without writing anything if `out` is too small to hold the encoding.
pub fn encode(r: Rune, out: &mut [u8]) -> usize {
    let n = rune_len(r);
    if out.len() < n {
        return 0;
    }
    match n {
        1 => out[0] = r as u8,
        2 => {
            out[0] = 0xC0 | ((r >> 6) as u8);
            out[1] = 0x80 | ((r & 0x3F) as u8);
        }
        3 => {
            out[0] = 0xE0 | ((r >> 12) as u8);
            out[1] = 0x80 | (((r >> 6) & 0x3F) as u8);
            out[2] = 0x80 | ((r & 0x3F) as u8);
        }
        4 => {
            out[0] = 0xF0 | ((r >> 18) as u8);
            out[1] = 0x80 | (((r >> 12) & 0x3F) as u8);
            out[2] = 0x80 | (((r >> 6) & 0x3F) as u8);
            out[3] = 0x80 | ((r & 0x3F) as u8);
        }
        _ => unreachable!("rune_len never exceeds 4"),
    }
    n
}

fn lead_len(b0: u8) -> Option<usize> {
    if b0 & 0x80 == 0 {
        Some(1)
    } else if b0 & 0xE0 == 0xC0 {
        Some(2)
    } else if b0 & 0xF0 == 0xE0 {
        Some(3)
    } else if b0 & 0xF8 == 0xF0 {
        Some(4)
    } else {
        None
    }
}

/// Decode one rune from the front of `bytes`.
///
/// Returns `Some((rune, n))` with `1 <= n <= 4` when a complete sequence
/// (valid or not) was consumed. Returns `None` when `bytes` holds a valid
/// leading byte but not enough continuation bytes yet — the caller should
/// read more and retry. A malformed sequence (bad leading byte or bad
/// continuation byte) yields `(WRONGRUNE, 1)`, consuming exactly one byte
/// to guarantee forward progress.
pub fn decode(bytes: &[u8]) -> Option<(Rune, usize)> {
    let b0 = *bytes.first()?;
    let want = match lead_len(b0) {
        Some(w) => w,
        None => return Some((WRONGRUNE, 1)),
    };
    if want == 1 {
        return Some((b0 as Rune, 1));
    }
    if bytes.len() < want {
        return None;
    }
    let mut r: u32 = match want {
        2 => (b0 & 0x1F) as u32,
        3 => (b0 & 0x0F) as u32,
        4 => (b0 & 0x07) as u32,
        _ => unreachable!(),
    };
    for &b in &bytes[1..want] {
        if b & 0xC0 != 0x80 {
            return Some((WRONGRUNE, 1));
        }
        r = (r << 6) | (b & 0x3F) as u32;
    }
    let min = match want {
        2 => 0x80,
        3 => 0x800,
        4 => 0x1_0000,
        _ => unreachable!(),
    };
    if r < min || r > 0x10FFFF || (0xD800..=0xDFFF).contains(&r) {
        return Some((WRONGRUNE, 1));
    }
    Some((r, want))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trip() {
        let mut buf = [0u8; 4];
        let n = encode('A' as Rune, &mut buf);
        assert_eq!(n, 1);
        assert_eq!(decode(&buf[..n]), Some(('A' as Rune, 1)));
    }

    #[test]
    fn multibyte_round_trip() {
        for ch in ['\u{00e9}', '\u{4e2d}', '\u{1f600}'] {
            let r = ch as Rune;
            let mut buf = [0u8; 4];
            let n = encode(r, &mut buf);
            assert_eq!(n, rune_len(r));
            assert_eq!(decode(&buf[..n]), Some((r, n)));
        }
    }

    #[test]
    fn encode_reports_zero_on_undersized_buffer() {
        let mut buf = [0u8; 1];
        assert_eq!(encode('\u{4e2d}' as Rune, &mut buf), 0);
        assert_eq!(buf, [0u8]);
    }

    #[test]
    fn decode_truncated_returns_none() {
        let full = "\u{4e2d}".as_bytes();
        assert_eq!(decode(&full[..1]), None);
        assert_eq!(decode(&full[..2]), None);
        assert_eq!(decode(full), Some(('\u{4e2d}' as Rune, 3)));
    }

    #[test]
    fn decode_bad_continuation_yields_wrongrune_and_advances_one() {
        let bytes = [0xC2u8, 0x20u8];
        assert_eq!(decode(&bytes), Some((WRONGRUNE, 1)));
    }

    #[test]
    fn decode_stray_continuation_byte_is_wrongrune() {
        assert_eq!(decode(&[0x80]), Some((WRONGRUNE, 1)));
    }

    #[test]
    fn decode_overlong_encoding_is_wrongrune() {
        // C0 80 is an overlong encoding of NUL.
        assert_eq!(decode(&[0xC0, 0x80]), Some((WRONGRUNE, 1)));
    }

    #[test]
    fn decode_empty_input_is_none() {
        assert_eq!(decode(&[]), None);
    }

    #[test]
    fn rune_len_matches_boundaries() {
        assert_eq!(rune_len(0x7f), 1);
        assert_eq!(rune_len(0x80), 2);
        assert_eq!(rune_len(0x7ff), 2);
        assert_eq!(rune_len(0x800), 3);
        assert_eq!(rune_len(0xffff), 3);
        assert_eq!(rune_len(0x1_0000), 4);
    }
}
