//! `GuiSurface`: the drawing-surface contract the editing core expects of
//! its GUI collaborator (spec.md §6.2), and its sole implementation on
//! top of `crossterm`.
//!
//! `original_source/gui.h`'s `struct gui` (`init`/`fini`/`getfont`/
//! `drawtext`/`drawrect`/`textwidth`/`nextevent`) is the direct ancestor;
//! its pixel-oriented `newwin`/`movewin`/`putwin` collapse away entirely
//! since a terminal has no sub-windows to create, only character cells to
//! address directly, and `drawcursor`/`decorate`/`setpointer` are spec.md
//! §6.2 additions with no counterpart in the teaching source's `x11.c` —
//! implemented here as the most direct terminal-native rendering of their
//! stated purpose (a cursor glyph, a modified-buffer marker, a no-op
//! pointer shape request, since terminals have no mouse cursor shape to
//! set).

use crate::event::{GButton, GEvent};
use anyhow::Result;
use core_text::Rune;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::{cursor::MoveTo, execute, queue, terminal};
use std::io::{Write, stdout};
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Border/margin geometry in character cells (spec.md §6.2's static
/// `border`, `hmargin`, `vmargin`, `actionr`). `original_source/x11.c`'s
/// pixel constants have no terminal counterpart to borrow from; these are
/// the spec's own geometry, expressed in cells instead of pixels.
pub const BORDER: usize = 1;
pub const HMARGIN: usize = 1;
pub const VMARGIN: usize = 0;

/// A window's clip rectangle, in character cells — the terminal
/// collapse of `gui.h`'s pixel `GWin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clip {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Clip {
    /// The per-window "grip" rectangle used to start a drag-resize
    /// gesture (spec.md §6.2 `actionr`): a single cell at the window's
    /// top-right corner.
    pub fn actionr(&self) -> Clip {
        Clip { x: self.x + self.w.saturating_sub(1), y: self.y, w: 1, h: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl GColor {
    pub const BLACK: GColor = GColor { red: 0, green: 0, blue: 0 };
    pub const WHITE: GColor = GColor { red: 255, green: 255, blue: 255 };
    pub const PALE_GREEN: GColor = GColor { red: 231, green: 255, blue: 221 };
    pub const PALE_YELLOW: GColor = GColor { red: 255, green: 255, blue: 234 };

    fn to_crossterm(self) -> Color {
        Color::Rgb { r: self.red, g: self.green, b: self.blue }
    }
}

/// Line metrics (`gui.h`'s `GFont`), collapsed to one terminal row: a
/// character cell has no ascent/descent of its own, but the fields are
/// kept so `core-render`'s layout arithmetic (shared in spirit with the
/// pixel original) reads the same regardless of backend.
#[derive(Debug, Clone, Copy)]
pub struct GFont {
    pub ascent: usize,
    pub descent: usize,
    pub height: usize,
}

/// Mouse/pointer shape request (spec.md §6.2 `setpointer`). Terminals
/// have no mouse pointer shape to change; `CrosstermSurface` accepts the
/// request and no-ops, so the dispatcher's resize-grip gesture logic does
/// not need backend-specific branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerShape {
    Normal,
    Text,
    ResizeHorizontal,
}

/// The contract the editing core expects of its drawing surface (spec.md
/// §6.2). A "mere collaborator" per §1: no editing semantics live here.
pub trait GuiSurface {
    fn init(&mut self) -> Result<RawFd>;
    fn fini(&mut self) -> Result<()>;
    fn sync(&mut self) -> Result<()>;
    fn getfont(&self) -> GFont;
    fn drawtext(&mut self, clip: Clip, runes: &[Rune], x: usize, y: usize, color: GColor) -> Result<()>;
    fn drawrect(&mut self, clip: Clip, x: usize, y: usize, w: usize, h: usize, color: GColor) -> Result<()>;
    fn drawcursor(&mut self, clip: Clip, insert_mode: bool, x: usize, y: usize, w: usize) -> Result<()>;
    fn decorate(&mut self, clip: Clip, modified_flag: bool, color: GColor) -> Result<()>;
    fn setpointer(&mut self, shape: PointerShape);
    fn textwidth(&self, runes: &[Rune]) -> usize;
    /// Non-blocking: `Ok(None)` when no event is currently queued.
    fn nextevent(&mut self) -> Result<Option<GEvent>>;
}

pub struct CrosstermSurface {
    font: GFont,
}

impl Default for CrosstermSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermSurface {
    pub fn new() -> Self {
        CrosstermSurface { font: GFont { ascent: 0, descent: 0, height: 1 } }
    }

    fn clip_contains(clip: Clip, x: usize, y: usize) -> bool {
        x >= clip.x && x < clip.x + clip.w && y >= clip.y && y < clip.y + clip.h
    }
}

impl GuiSurface for CrosstermSurface {
    fn init(&mut self) -> Result<RawFd> {
        // stdin (fd 0) is the readable fd the dispatcher registers with
        // the event loop (spec.md §6.2 `init() -> readable_fd`): any
        // terminal input — key or mouse — makes it readable.
        Ok(0)
    }

    fn fini(&mut self) -> Result<()> {
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        stdout().flush()?;
        Ok(())
    }

    fn getfont(&self) -> GFont {
        self.font
    }

    fn drawtext(&mut self, clip: Clip, runes: &[Rune], x: usize, y: usize, color: GColor) -> Result<()> {
        if !Self::clip_contains(clip, x, y) {
            return Ok(());
        }
        let max_w = clip.x + clip.w - x;
        let s: String =
            runes.iter().take(max_w).map(|&r| char::from_u32(r).unwrap_or('\u{fffd}')).collect();
        queue!(
            stdout(),
            MoveTo(x as u16, y as u16),
            SetForegroundColor(color.to_crossterm()),
            Print(s),
            ResetColor
        )?;
        Ok(())
    }

    fn drawrect(&mut self, clip: Clip, x: usize, y: usize, w: usize, h: usize, color: GColor) -> Result<()> {
        let row = " ".repeat(w);
        for dy in 0..h {
            if !Self::clip_contains(clip, x, y + dy) {
                continue;
            }
            queue!(
                stdout(),
                MoveTo(x as u16, (y + dy) as u16),
                crossterm::style::SetBackgroundColor(color.to_crossterm()),
                Print(&row),
                ResetColor
            )?;
        }
        Ok(())
    }

    fn drawcursor(&mut self, clip: Clip, insert_mode: bool, x: usize, y: usize, w: usize) -> Result<()> {
        if !Self::clip_contains(clip, x, y) {
            return Ok(());
        }
        // A thin bar in insert mode, a reverse-video block otherwise
        // (spec.md §4.5 redraw: "a thin bar in insert mode or a block
        // otherwise").
        let cell = if insert_mode { "|".to_string() } else { " ".repeat(w.max(1)) };
        queue!(
            stdout(),
            MoveTo(x as u16, y as u16),
            crossterm::style::SetAttribute(crossterm::style::Attribute::Reverse),
            Print(&cell),
            crossterm::style::SetAttribute(crossterm::style::Attribute::Reset)
        )?;
        Ok(())
    }

    fn decorate(&mut self, clip: Clip, modified_flag: bool, color: GColor) -> Result<()> {
        if clip.w == 0 {
            return Ok(());
        }
        let marker = if modified_flag { "*" } else { " " };
        queue!(
            stdout(),
            MoveTo((clip.x + clip.w - 1) as u16, clip.y as u16),
            SetForegroundColor(color.to_crossterm()),
            Print(marker),
            ResetColor
        )?;
        Ok(())
    }

    fn setpointer(&mut self, _shape: PointerShape) {
        // Terminals have no mouse pointer shape to change.
    }

    fn textwidth(&self, runes: &[Rune]) -> usize {
        runes.iter().map(|&r| core_text::rune_width(r).max(1)).sum()
    }

    fn nextevent(&mut self) -> Result<Option<GEvent>> {
        if !event::poll(Duration::from_millis(0))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Resize(w, h) => Ok(Some(GEvent::Resize { w: w as usize, h: h as usize })),
            Event::Key(k) if k.kind != KeyEventKind::Release => Ok(key_event_to_gevent(k.code)),
            Event::Mouse(m) => Ok(mouse_event_to_gevent(m)),
            _ => Ok(None),
        }
    }
}

fn key_event_to_gevent(code: KeyCode) -> Option<GEvent> {
    use crate::event::GKey;
    let rune: Rune = match code {
        KeyCode::Char(c) => c as Rune,
        KeyCode::Enter => b'\n' as Rune,
        KeyCode::Tab => b'\t' as Rune,
        KeyCode::Esc => GKey::ESC,
        KeyCode::Backspace => GKey::BACKSPACE,
        KeyCode::Left => GKey::LEFT,
        KeyCode::Right => GKey::RIGHT,
        KeyCode::Up => GKey::UP,
        KeyCode::Down => GKey::DOWN,
        KeyCode::PageUp => GKey::PAGE_UP,
        KeyCode::PageDown => GKey::PAGE_DOWN,
        KeyCode::F(1) => GKey::F1,
        KeyCode::F(2) => GKey::F2,
        KeyCode::F(3) => GKey::F3,
        KeyCode::F(4) => GKey::F4,
        KeyCode::F(5) => GKey::F5,
        KeyCode::F(6) => GKey::F6,
        KeyCode::F(7) => GKey::F7,
        KeyCode::F(8) => GKey::F8,
        KeyCode::F(9) => GKey::F9,
        KeyCode::F(10) => GKey::F10,
        KeyCode::F(11) => GKey::F11,
        KeyCode::F(12) => GKey::F12,
        _ => return None,
    };
    Some(GEvent::Key { rune })
}

fn mouse_event_to_gevent(m: crossterm::event::MouseEvent) -> Option<GEvent> {
    let x = m.column as usize;
    let y = m.row as usize;
    match m.kind {
        MouseEventKind::Down(b) => Some(GEvent::MouseDown { button: button_to_gbutton(b), x, y }),
        MouseEventKind::Up(b) => Some(GEvent::MouseUp { button: button_to_gbutton(b), x, y }),
        MouseEventKind::Drag(_) => Some(GEvent::MouseSelect { x, y }),
        MouseEventKind::ScrollUp => Some(GEvent::MouseDown { button: GButton::WheelUp, x, y }),
        MouseEventKind::ScrollDown => Some(GEvent::MouseDown { button: GButton::WheelDown, x, y }),
        _ => None,
    }
}

fn button_to_gbutton(b: crossterm::event::MouseButton) -> GButton {
    match b {
        crossterm::event::MouseButton::Left => GButton::Left,
        crossterm::event::MouseButton::Right => GButton::Right,
        crossterm::event::MouseButton::Middle => GButton::Middle,
    }
}

impl Drop for CrosstermSurface {
    fn drop(&mut self) {
        let _ = execute!(stdout(), terminal::Clear(terminal::ClearType::All));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_contains_respects_bounds() {
        let c = Clip { x: 2, y: 2, w: 5, h: 3 };
        assert!(CrosstermSurface::clip_contains(c, 2, 2));
        assert!(CrosstermSurface::clip_contains(c, 6, 4));
        assert!(!CrosstermSurface::clip_contains(c, 7, 4));
        assert!(!CrosstermSurface::clip_contains(c, 1, 2));
    }

    #[test]
    fn actionr_is_top_right_single_cell() {
        let c = Clip { x: 0, y: 0, w: 10, h: 5 };
        let grip = c.actionr();
        assert_eq!(grip, Clip { x: 9, y: 0, w: 1, h: 1 });
    }

    #[test]
    fn textwidth_sums_rune_widths() {
        let s = CrosstermSurface::new();
        let runes: Vec<Rune> = "hi".chars().map(|c| c as Rune).collect();
        assert_eq!(s.textwidth(&runes), 2);
    }
}
