//! The modal command parser (spec component C7, spec.md §4.7).
//!
//! A direct port of `original_source/cmd.c`'s `cmd_parse` state machine
//! (`SBuf0`/`SBuf1`/`SCmd`/`SDbl`/`SArg`) and its `insert`/`perform`
//! helpers. Kept thin per spec.md's "treat it as a trusted consumer of
//! C3": key handling mutates the `EBuf`/`Window` it is given directly
//! rather than building up an intermediate command object for some other
//! layer to interpret.

use crate::command::{Cmd, CmdFlags, ParsedCommand, flags_for, risreg};
use crate::motion::{self, Motion};
use core_model::Window;
use core_state::EBuf;
use core_text::Rune;

/// `gui.h`'s `GKEsc`.
pub const ESC: Rune = 0x1b;
/// Must match `core-terminal`'s `GKey::BACKSPACE` — both sides of the
/// key-event wire agree on the private-use-area encoding (spec.md §6.2)
/// without core-keymap depending on the terminal crate.
pub const BACKSPACE: Rune = 0xe013;
/// `'q'-'a'+1`: the literal control-code `cmd.c` matches for exit.
const CTRL_Q: Rune = b'q' as Rune - b'a' as Rune + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Command,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SBuf0,
    SBuf1,
    SCmd,
    SDbl,
    SArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Active {
    Main,
    Motion,
}

/// What happened in response to one key event.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Consumed; nothing externally visible yet (still mid-parse, or a
    /// no-op command).
    None,
    /// `erroneous command` (spec.md §7).
    Error(&'static str),
    /// `Ctrl-Q`: the editor should exit.
    Exit,
    /// The cursor moved to a new offset by a bare motion.
    Moved { cursor: usize },
    /// Insert mode was entered or left.
    ModeChanged,
    /// A fully parsed command that isn't a motion and isn't handled
    /// in-parser (`cmd.c`'s `perform` falls through for anything besides
    /// exit/insert/undo/redo); the caller (C6) may interpret it further.
    Command(ParsedCommand),
}

/// Is `r` one of the bare motion runes (`h j k l w e W E b B 0 $` plus the
/// space alias for `l`)?
fn is_motion_rune(r: Rune) -> bool {
    Motion::from_rune(r).is_some()
}

pub struct KeyParser {
    mode: Mode,
    state: State,
    active: Active,
    buf: Option<char>,
    c: Cmd,
    m: Cmd,
}

impl Default for KeyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyParser {
    pub fn new() -> Self {
        KeyParser {
            mode: Mode::Command,
            state: State::SBuf0,
            active: Active::Main,
            buf: None,
            c: Cmd::default(),
            m: Cmd::default(),
        }
    }

    pub fn in_insert_mode(&self) -> bool {
        self.mode == Mode::Insert
    }

    fn reset(&mut self) {
        self.buf = None;
        self.c.clear();
        self.m.clear();
        self.state = State::SBuf0;
        self.active = Active::Main;
    }

    pub fn handle_key(&mut self, r: Rune, eb: &mut EBuf, win: &mut Window) -> Outcome {
        if self.mode == Mode::Insert {
            return self.insert(r, eb, win);
        }
        if r == ESC {
            self.reset();
            return Outcome::None;
        }
        self.parse(r, eb, win)
    }

    fn insert(&mut self, r: Rune, eb: &mut EBuf, win: &mut Window) -> Outcome {
        if r == ESC {
            let cu = win.cursor();
            if cu > 0 {
                win.set_cursor(cu - 1);
            }
            eb.commit();
            self.mode = Mode::Command;
            return Outcome::ModeChanged;
        }
        if r == BACKSPACE {
            let cu = win.cursor();
            if cu > 0 {
                eb.del(cu - 1, cu);
                win.set_cursor(cu - 1);
            }
        } else {
            let cu = win.cursor();
            eb.ins(cu, r);
            win.set_cursor(cu + 1);
        }
        Outcome::None
    }

    /// `cmd_parse`'s `switch (state)` body, minus the `Insert` branch
    /// (handled above).
    fn parse(&mut self, r: Rune, eb: &mut EBuf, win: &mut Window) -> Outcome {
        match self.state {
            State::SBuf1 => {
                if !risreg(r) {
                    self.reset();
                    return Outcome::Error("erroneous command");
                }
                self.buf = Some(r as u8 as char);
                self.state = State::SCmd;
                self.active = Active::Main;
                Outcome::None
            }

            State::SBuf0 => {
                if r == b'"' as Rune {
                    self.state = State::SBuf1;
                    return Outcome::None;
                }
                self.state = State::SCmd;
                self.active = Active::Main;
                self.cmd_char(r, eb, win)
            }

            State::SCmd => self.cmd_char(r, eb, win),

            State::SDbl => {
                let expected = self.active_cmd().c;
                if r as u8 as char != expected {
                    self.reset();
                    return Outcome::Error("erroneous command");
                }
                self.after_double(eb, win)
            }

            State::SArg => {
                if r > 127 {
                    self.reset();
                    return Outcome::Error("erroneous command");
                }
                self.active_cmd_mut().arg = Some(r as u8 as char);
                self.after_argument(eb, win)
            }
        }
    }

    fn active_cmd(&self) -> &Cmd {
        match self.active {
            Active::Main => &self.c,
            Active::Motion => &self.m,
        }
    }

    fn active_cmd_mut(&mut self) -> &mut Cmd {
        match self.active {
            Active::Main => &mut self.c,
            Active::Motion => &mut self.m,
        }
    }

    /// `cmd_parse`'s `case SCmd` body: digits accumulate into the count,
    /// any other ASCII rune becomes the command char and its flags decide
    /// the next state.
    fn cmd_char(&mut self, r: Rune, eb: &mut EBuf, win: &mut Window) -> Outcome {
        if r > b'~' as Rune {
            self.reset();
            return Outcome::Error("erroneous command");
        }
        let ch = r as u8 as char;
        if ch.is_ascii_digit() && (ch != '0' || self.active_cmd().count != 0) {
            let cmd = self.active_cmd_mut();
            cmd.count = cmd.count * 10 + (ch as u32 - '0' as u32);
            return Outcome::None;
        }
        self.active_cmd_mut().c = ch;
        let flags = flags_for(ch);
        if flags.contains(CmdFlags::DOUBLE) {
            self.state = State::SDbl;
            return Outcome::None;
        }
        self.after_double(eb, win)
    }

    fn after_double(&mut self, eb: &mut EBuf, win: &mut Window) -> Outcome {
        let flags = flags_for(self.active_cmd().c);
        if flags.contains(CmdFlags::ARGUMENT) {
            self.state = State::SArg;
            return Outcome::None;
        }
        self.after_argument(eb, win)
    }

    fn after_argument(&mut self, eb: &mut EBuf, win: &mut Window) -> Outcome {
        let flags = flags_for(self.active_cmd().c);
        if flags.contains(CmdFlags::MOTION) && self.active == Active::Main {
            self.active = Active::Motion;
            self.state = State::SCmd;
            return Outcome::None;
        }
        self.perform(eb, win)
    }

    /// `cmd.c`'s `perform`: apply a bare motion directly, otherwise
    /// dispatch the small set of commands this layer knows about
    /// (exit / enter-insert / undo / redo). Anything else is handed back
    /// to the caller as a parsed command for the command layer (C6) to
    /// interpret (builtins, marks, etc. are out of this thin parser's
    /// scope).
    fn perform(&mut self, eb: &mut EBuf, win: &mut Window) -> Outcome {
        let result = if is_motion_rune(self.c.c as Rune) {
            let motion = Motion::from_rune(self.c.c as Rune).expect("checked above");
            let cu = win.cursor();
            let new_cu = motion::apply(win_buf(eb), cu, motion, self.c.count);
            win.set_cursor(new_cu);
            Outcome::Moved { cursor: new_cu }
        } else {
            match self.c.c as u32 as Rune {
                CTRL_Q => Outcome::Exit,
                r if r == b'i' as Rune => {
                    self.mode = Mode::Insert;
                    Outcome::ModeChanged
                }
                r if r == b'u' as Rune => {
                    eb.undo();
                    Outcome::None
                }
                r if r == b'.' as Rune => {
                    eb.redo();
                    Outcome::None
                }
                _ => Outcome::Command(ParsedCommand {
                    buf: self.buf,
                    main: self.c,
                    motion: if self.m.c != '\0' { Some(self.m) } else { None },
                }),
            }
        };
        self.reset();
        result
    }
}

fn win_buf(eb: &mut EBuf) -> &mut core_text::Buf {
    eb.buf_mut()
}
