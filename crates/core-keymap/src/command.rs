//! Command-rune flags and the captured fields of a parsed command
//! (`original_source/cmd.c`'s `struct cmd` and its `cmds[]` flags table).

use core_text::Rune;

bitflags::bitflags! {
    /// A command rune's expected continuation (`cmd.c`'s `CDouble` /
    /// `CMotion` / `CArgument`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CmdFlags: u8 {
        /// Expects the same rune doubled (`dd`, `gg`, `[[`).
        const DOUBLE = 1;
        /// Expects a trailing motion (`dw`, `dj`).
        const MOTION = 1 << 1;
        /// Expects a single trailing argument rune (`ma`, `'a`).
        const ARGUMENT = 1 << 2;
    }
}

/// Lookup table mirroring `cmd.c`'s `cmds[]` sparse array: which command
/// runes expect a doubled/motion/argument continuation. Every command not
/// listed here expects nothing further once its rune is read.
pub fn flags_for(c: char) -> CmdFlags {
    match c {
        'd' => CmdFlags::MOTION,
        'g' => CmdFlags::DOUBLE,
        'm' => CmdFlags::ARGUMENT,
        '[' => CmdFlags::DOUBLE,
        '\'' => CmdFlags::ARGUMENT,
        _ => CmdFlags::empty(),
    }
}

/// `cmd.c`'s `risreg`: lowercase ASCII letters are valid buffer/register
/// names after a `"` prefix.
pub fn risreg(r: Rune) -> bool {
    r <= '~' as Rune && (r as u8 as char).is_ascii_lowercase()
}

/// One command or motion token as accumulated by the parser: an optional
/// decimal repeat count, a command rune, and an optional argument rune.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cmd {
    pub count: u32,
    pub c: char,
    pub arg: Option<char>,
}

impl Cmd {
    pub fn clear(&mut self) {
        *self = Cmd::default();
    }
}

/// A fully parsed command (spec.md §4.7: "optional buffer prefix `"x`,
/// decimal count, command rune, then either a doubled rune, a single
/// argument rune, a motion, or nothing").
#[derive(Debug, Clone, Copy)]
pub struct ParsedCommand {
    pub buf: Option<char>,
    pub main: Cmd,
    pub motion: Option<Cmd>,
}
