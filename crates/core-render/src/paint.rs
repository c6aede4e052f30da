//! Per-window painting: body text, selection highlight, cursor, tag line,
//! and the modified-buffer decoration (spec.md §4.5 redraw; grounded on
//! `original_source/win.c`'s `draw`/`drawfn`/`pushrune` trio).
//!
//! `pushrune`'s pixel-fragment buffering (batch runes until a tab/newline
//! forces a flush) has no payoff in a terminal, where a cell is already
//! the atomic unit of drawing; each visible rune is painted with its own
//! `drawtext` call instead, keeping `pushrune`'s tab-stop-jump and
//! newline-flush structure without the fragment buffer.

use crate::dirty::RowCache;
use anyhow::Result;
use core_model::{Window, layout_line};
use core_state::{EBuf, SEL_BEG, SEL_END};
use core_terminal::{Clip, GColor, GuiSurface};
use core_text::{NEWLINE, Rune};

struct Cell {
    rune: Rune,
    col: usize,
    width: usize,
    selected: bool,
    is_cursor: bool,
}

/// Paint one window's body into `clip` (already excludes its tag row, if
/// shown). `show_cursor` is true only for the dispatcher's current window
/// (spec.md §4.8 owns a single current-window pointer).
pub fn paint_body<S: GuiSurface>(
    surface: &mut S,
    clip: Clip,
    win: &Window,
    eb: &mut EBuf,
    show_cursor: bool,
    insert_mode: bool,
    cache: &mut RowCache,
) -> Result<()> {
    if clip.w == 0 || clip.h == 0 {
        return Ok(());
    }
    let sel_beg = eb.getmark(SEL_BEG);
    let sel_end = eb.getmark(SEL_END);
    let cursor = win.cursor();
    let width_limit = clip.w;
    let stop = win.stop();
    let mut off = win.start();
    let mut row = 0usize;
    let mut cursor_xy: Option<(usize, usize, usize)> = None;
    let mut last_row_painted = 0usize;

    while row < clip.h && off <= stop {
        let mut cells: Vec<Cell> = Vec::new();
        let y = clip.y + row;
        let next_off = layout_line(|i| eb.buf_mut().get(i), off, width_limit, |pos, r, col, rw, sl| {
            if pos > stop || sl != 0 {
                return false;
            }
            if r == NEWLINE {
                return true;
            }
            let selected = matches!((sel_beg, sel_end), (Some(b), Some(e)) if pos >= b && pos < e);
            let is_cursor = pos == cursor;
            if is_cursor {
                cursor_xy = Some((clip.x + col, y, rw.max(1)));
            }
            cells.push(Cell { rune: r, col, width: rw.max(1), selected, is_cursor });
            true
        });

        let row_hash_content: Vec<Rune> = cells.iter().map(|c| c.rune).collect();
        let row_selected = cells.iter().any(|c| c.selected);
        let row_has_cursor = cells.iter().any(|c| c.is_cursor);
        if cache.mark_and_check(clip.h, row, &row_hash_content, row_selected, row_has_cursor) {
            surface.drawrect(clip, clip.x, y, clip.w, 1, GColor::WHITE)?;
            for cell in &cells {
                let x = clip.x + cell.col;
                if cell.selected {
                    surface.drawrect(clip, x, y, cell.width, 1, GColor::PALE_YELLOW)?;
                }
                surface.drawtext(clip, &[cell.rune], x, y, GColor::BLACK)?;
            }
        }

        row += 1;
        last_row_painted = row;
        if next_off == off {
            break;
        }
        off = next_off;
    }

    if show_cursor {
        match cursor_xy {
            Some((x, y, w)) => surface.drawcursor(clip, insert_mode, x, y, w)?,
            None if last_row_painted > 0 => {
                surface.drawcursor(clip, insert_mode, clip.x, clip.y + last_row_painted.min(clip.h) - 1, 1)?
            }
            None => {}
        }
    }
    Ok(())
}

/// Paint a window's tag mini-buffer (spec.md §4.5 `tag_toggle`), a
/// single row drawn with a distinct background (`win.c` has no tag
/// concept of its own to ground this on; acme's own pale-yellow tag
/// convention is the nearest real precedent and is used here).
pub fn paint_tag<S: GuiSurface>(surface: &mut S, clip: Clip, win: &Window) -> Result<()> {
    if clip.h == 0 {
        return Ok(());
    }
    surface.drawrect(clip, clip.x, clip.y, clip.w, 1, GColor::PALE_GREEN)?;
    let runes: Vec<Rune> = win.tag().text.chars().map(|c| c as Rune).collect();
    surface.drawtext(clip, &runes, clip.x, clip.y, GColor::BLACK)?;
    Ok(())
}
