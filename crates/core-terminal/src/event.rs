//! GUI event types (spec.md §6.2 `GEvent`).
//!
//! Grounded on `original_source/gui.h`'s `struct gevent` and the
//! `GKEsc`/`GKF1..GKF12`/arrow/page key constants in the Unicode private
//! use area (`0xE001..`); spec.md §6.2 additionally names `MouseSelect`
//! (drag-select) alongside `MouseDown`/`MouseUp`, which `gui.h` does not
//! have a dedicated variant for (its `x11.c` collaborator folds dragging
//! into repeated `GButPress`/motion callbacks) — kept as its own variant
//! here since the dispatcher (C8) distinguishes a click from a drag.

use core_text::Rune;

/// Non-printable key codes (`gui.h`'s `GKEsc` and the private-use-area
/// block starting at `GKF1`), namespaced as associated constants rather
/// than a bare module so callers write `GKey::ESC` the way the original
/// wrote `GKEsc`.
pub struct GKey;

impl GKey {
    pub const ESC: Rune = 0x1b;
    pub const BACKSPACE: Rune = 0xe013;
    const PUA_BASE: Rune = 0xe001;
    pub const F1: Rune = Self::PUA_BASE;
    pub const F2: Rune = Self::PUA_BASE + 1;
    pub const F3: Rune = Self::PUA_BASE + 2;
    pub const F4: Rune = Self::PUA_BASE + 3;
    pub const F5: Rune = Self::PUA_BASE + 4;
    pub const F6: Rune = Self::PUA_BASE + 5;
    pub const F7: Rune = Self::PUA_BASE + 6;
    pub const F8: Rune = Self::PUA_BASE + 7;
    pub const F9: Rune = Self::PUA_BASE + 8;
    pub const F10: Rune = Self::PUA_BASE + 9;
    pub const F11: Rune = Self::PUA_BASE + 10;
    pub const F12: Rune = Self::PUA_BASE + 11;
    pub const LEFT: Rune = Self::PUA_BASE + 12;
    pub const RIGHT: Rune = Self::PUA_BASE + 13;
    pub const UP: Rune = Self::PUA_BASE + 14;
    pub const DOWN: Rune = Self::PUA_BASE + 15;
    pub const PAGE_UP: Rune = Self::PUA_BASE + 16;
    pub const PAGE_DOWN: Rune = Self::PUA_BASE + 17;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GEvent {
    Resize { w: usize, h: usize },
    Key { rune: Rune },
    MouseDown { button: GButton, x: usize, y: usize },
    MouseUp { button: GButton, x: usize, y: usize },
    MouseSelect { x: usize, y: usize },
}
