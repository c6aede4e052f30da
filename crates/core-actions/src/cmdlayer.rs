//! Textual line commands (spec.md §4.6): a "current line" is parsed for
//! one of a handful of builtins, falling back to a shell command.
//!
//! Grounded on `original_source/exec.c`'s `ex_run`/`lookup`/`skipb`/
//! `buftobytes`/`get`/`look`. The dispatcher (C8) calls `run_at_cursor`
//! on a middle-click and `look_at_cursor` on a right-click, mirroring
//! Acme's real three-button model (`exec.c`'s `ex_run`/`ex_look` are never
//! wired to a key in this tree's `cmd.c`, only declared for an external
//! caller to invoke).

use crate::EBufHandle;
use crate::task::{self, PipeMode, TaskTable};
use core_events::EventLoop;
use core_model::Window;
use core_state::{EditError, marks};
use core_text::{Buf, NEWLINE, Rune};
use std::path::{Path, PathBuf};

/// `exec.c`'s `risblank`: ASCII space/tab (not a full Unicode predicate,
/// matching the donor's own ASCII-only check).
fn risblank(r: Rune) -> bool {
    r <= 0x7f && matches!(r as u8, b' ' | b'\t')
}

/// `exec.c`'s `skipb`: scan by `dir` while the rune underfoot is blank.
fn skipb(b: &mut Buf, mut p: usize, dir: isize) -> usize {
    while risblank(b.get(p)) {
        p = (p as isize + dir) as usize;
    }
    p
}

const BUILTIN_NAMES: [&str; 5] = ["Get", "Put", "Look", "New", "Del"];

enum Builtin {
    Get,
    Put,
    Look,
    New,
    Del,
}

impl Builtin {
    fn from_name(name: &str) -> Builtin {
        match name {
            "Get" => Builtin::Get,
            "Put" => Builtin::Put,
            "Look" => Builtin::Look,
            "New" => Builtin::New,
            "Del" => Builtin::Del,
            _ => unreachable!("name came from BUILTIN_NAMES"),
        }
    }
}

/// `exec.c`'s `lookup`: match a builtin name at the start of the line
/// containing `p0`, on a word boundary (trailing blank or newline).
/// Returns the builtin and the offset just past its name and any
/// following blanks, or `None` and the bare start-of-line offset when
/// nothing matches (the caller treats the whole line as a shell command).
fn lookup(b: &mut Buf, p0: usize) -> (Option<Builtin>, usize) {
    let start = skipb(b, b.bol(p0), 1);
    for name in BUILTIN_NAMES {
        let mut p = start;
        let mut matched = true;
        for ch in name.chars() {
            if b.get(p) != ch as Rune {
                matched = false;
                break;
            }
            p += 1;
        }
        if matched {
            let r = b.get(p);
            if risblank(r) || r == NEWLINE {
                return (Some(Builtin::from_name(name)), skipb(b, p, 1));
            }
        }
    }
    (None, start)
}

/// `exec.c`'s `buftobytes`, minus its manual UTF-8 encoding loop (spec.md
/// §9: this layer stays on `char`/`String`, `core-text::encode` does the
/// actual byte-level work elsewhere).
fn buftobytes(b: &mut Buf, p0: usize, p1: usize) -> String {
    let mut s = String::with_capacity(p1.saturating_sub(p0));
    for p in p0..p1 {
        if let Some(c) = char::from_u32(b.get(p)) {
            s.push(c);
        }
    }
    s
}

/// The rest-of-line argument text for a builtin or shell command: from
/// `p0` to the end of line, trailing blanks trimmed (`get`/`look`/`run`
/// each compute this the same way before calling `buftobytes`).
fn rest_of_line(b: &mut Buf, p0: usize) -> (usize, String) {
    let eol = b.eol(p0);
    let p1 = 1 + skipb(b, eol.saturating_sub(1), -1);
    if p1 <= p0 {
        (eol, String::new())
    } else {
        (eol, buftobytes(b, p0, p1))
    }
}

/// Parse a `Get`/`New` argument of the shape `path[:line]`.
fn parse_path_line(arg: &str) -> (Option<PathBuf>, usize) {
    if arg.is_empty() {
        return (None, 1);
    }
    match arg.rsplit_once(':') {
        Some((path, lineno)) if !path.is_empty() => {
            let ln: i64 = lineno.parse().unwrap_or(1);
            let ln = if ln < 1 { 1 } else { ln as usize };
            (Some(PathBuf::from(path)), ln)
        }
        _ => (Some(PathBuf::from(arg)), 1),
    }
}

/// `Get [file[:line]]` (`exec.c`'s `get`): load a file fresh into the
/// current document, or reload its existing path if no argument is
/// given, then move the cursor to the named line.
fn get(eb: &EBufHandle, win: &mut Window, arg: &str) -> Result<(), EditError> {
    let (path, line) = parse_path_line(arg);
    let mut e = eb.borrow_mut();
    let resolved = match path {
        Some(p) => p,
        None => e.path().map(Path::to_path_buf).ok_or(EditError::NoFileToRead)?,
    };
    e.buf_mut().clr();
    e.read_from_path(&resolved)?;
    let cu = e.buf_mut().setlc(line.saturating_sub(1), 0);
    drop(e);
    win.set_cursor(cu);
    win.mark_dirty();
    Ok(())
}

/// `Put [file]` (spec.md §7 "file exists" guard): write to the current
/// path, or to an explicit path that must not already exist.
fn put(eb: &EBufHandle, arg: &str) -> Result<(), EditError> {
    let mut e = eb.borrow_mut();
    if arg.is_empty() {
        e.write()
    } else {
        let path = Path::new(arg);
        if path.exists() {
            return Err(EditError::FileExists);
        }
        e.write_to_path(path, false)
    }
}

/// `Look word` or a bare `Look` over the current line's trimmed text
/// (`exec.c`'s `look`, reusing `ex_look`'s wrap-around search).
fn look(eb: &EBufHandle, win: &mut Window, arg: &str, p0: usize) -> Result<(), EditError> {
    let mut e = eb.borrow_mut();
    let pattern: Vec<Rune> = if arg.is_empty() {
        if e.buf_mut().get(p0) == NEWLINE {
            return Err(EditError::ErroneousCommand);
        }
        let (_, text) = rest_of_line(e.buf_mut(), p0);
        text.chars().map(|c| c as Rune).collect()
    } else {
        arg.chars().map(|c| c as Rune).collect()
    };
    look_for(&mut e, win, &pattern)
}

/// `ex_look`: search from one past the cursor, wrapping to the start of
/// the buffer, and mark the match as the current selection.
fn look_for(eb: &mut core_state::EBuf, win: &mut Window, pattern: &[Rune]) -> Result<(), EditError> {
    if pattern.is_empty() {
        return Err(EditError::ErroneousCommand);
    }
    let cu = win.cursor();
    let hit = eb.look(cu + 1, pattern).or_else(|| eb.look(0, pattern));
    match hit {
        Some(p) => {
            win.set_cursor(p);
            eb.setmark(marks::SEL_BEG, p);
            eb.setmark(marks::SEL_END, p + pattern.len());
            Ok(())
        }
        None => Err(EditError::NoMatch),
    }
}

/// `New [file[:line]]`: replace the current document with a fresh,
/// empty one (optionally loaded from a file), leaving any outstanding
/// `Task`s bound to the old document's own `EBufHandle` untouched
/// (`original_source/win.c`'s `win_new`/`eb_new`, generalized from
/// "a new window" to "the current window's new document" to fit this
/// tree's one-document-per-`Frame` model).
pub fn new_document(current: &mut EBufHandle, arg: &str) -> Result<(), EditError> {
    let (path, _line) = parse_path_line(arg);
    current.borrow_mut().kill();
    let mut fresh = core_state::EBuf::new();
    if let Some(p) = &path {
        fresh.read_from_path(p)?;
    }
    *current = crate::new_handle(fresh);
    Ok(())
}

/// `Del`: close the current window (`original_source/win.c`'s
/// `win_delete`), refusing to close the last one.
pub fn del_window(frame: &mut core_model::Frame, idx: usize) -> Result<(), EditError> {
    if frame.windows().len() <= 1 {
        return Err(EditError::LastWindow);
    }
    frame.delete_window(idx);
    Ok(())
}

/// Execute the command found on the line under the cursor (`exec.c`'s
/// `ex_run`): a builtin if the line starts with one of `BUILTIN_NAMES`,
/// otherwise the whole line is handed to the shell (`exec.c`'s `run`).
/// Takes the whole `Frame` (not just the focused `Window`) because `Del`
/// closes a window outright, something no single `Window` can do to
/// itself.
pub fn run_at_cursor(
    eb: &mut EBufHandle,
    frame: &mut core_model::Frame,
    idx: usize,
    events: &mut EventLoop,
    tasks: &mut TaskTable,
) -> Result<(), EditError> {
    let p0 = frame.window(idx).ok_or(EditError::ErroneousCommand)?.cursor();
    let (builtin, p1) = lookup(eb.borrow_mut().buf_mut(), p0);
    match builtin {
        Some(Builtin::Get) => {
            let (_, arg) = rest_of_line(eb.borrow_mut().buf_mut(), p1);
            get(eb, frame.window_mut(idx).ok_or(EditError::ErroneousCommand)?, &arg)
        }
        Some(Builtin::Put) => {
            let (_, arg) = rest_of_line(eb.borrow_mut().buf_mut(), p1);
            put(eb, &arg)
        }
        Some(Builtin::Look) => {
            let (_, arg) = rest_of_line(eb.borrow_mut().buf_mut(), p1);
            look(eb, frame.window_mut(idx).ok_or(EditError::ErroneousCommand)?, &arg, p1)
        }
        Some(Builtin::New) => {
            let (_, arg) = rest_of_line(eb.borrow_mut().buf_mut(), p1);
            new_document(eb, &arg)
        }
        Some(Builtin::Del) => del_window(frame, idx),
        None => {
            let (eol, cmd) = rest_of_line(eb.borrow_mut().buf_mut(), p0);
            if cmd.is_empty() {
                return Ok(());
            }
            let (ctyp, body) = match cmd.chars().next() {
                Some(c @ ('<' | '>' | '|')) => (Some(c), &cmd[c.len_utf8()..]),
                _ => (None, cmd.as_str()),
            };
            let win = frame.window_mut(idx).ok_or(EditError::ErroneousCommand)?;
            task::spawn_shell(eb, win, eol, ctyp, body, events, tasks)
                .map_err(|_| EditError::ErroneousCommand)
        }
    }
}

/// Right-click "look" equivalent: search for the word under a given
/// offset without requiring a typed `Look` command line.
pub fn look_at_cursor(eb: &EBufHandle, win: &mut Window, p0: usize) -> Result<(), EditError> {
    win.set_cursor(p0);
    look(eb, win, "", p0)
}

/// spec.md §7: every `EditError` is surfaced by appending its `Display`
/// text as a line immediately after the end of the line containing
/// `p0` (the command or click that produced it), committed as its own
/// undo group so the report can be undone on its own.
pub fn report_error(eb: &EBufHandle, p0: usize, msg: &str) {
    let mut e = eb.borrow_mut();
    let eol = e.buf_mut().eol(p0);
    let at = eol + 1;
    let n = e.ins_utf8(at, msg.as_bytes());
    e.ins(at + n, NEWLINE);
    e.commit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::Rect;
    use core_state::EBuf;

    fn filled(s: &str) -> EBufHandle {
        let mut e = EBuf::new();
        for (i, ch) in s.chars().enumerate() {
            e.ins(i, ch as Rune);
        }
        e.commit();
        crate::new_handle(e)
    }

    fn win() -> Window {
        Window::new(Rect::new(0, 0, 80, 24), 16384)
    }

    #[test]
    fn lookup_matches_get_on_word_boundary() {
        let eb = filled("Get foo.txt\n");
        let (b, p1) = lookup(eb.borrow_mut().buf_mut(), 0);
        assert!(matches!(b, Some(Builtin::Get)));
        assert_eq!(p1, 4);
    }

    #[test]
    fn lookup_rejects_prefix_without_boundary() {
        let eb = filled("Getx foo.txt\n");
        let (b, _) = lookup(eb.borrow_mut().buf_mut(), 0);
        assert!(matches!(b, None));
    }

    #[test]
    fn get_loads_file_and_replaces_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "hello\nworld\n").unwrap();
        let eb = filled("old content");
        let mut w = win();
        get(&eb, &mut w, &path.display().to_string()).unwrap();
        assert_eq!(eb.borrow().path(), Some(path.as_path()));
        let len = eb.borrow().buf().len();
        assert_eq!(len, 12);
    }

    #[test]
    fn get_with_line_suffix_moves_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "aaa\nbbb\nccc\n").unwrap();
        let eb = filled("");
        let mut w = win();
        let arg = format!("{}:2", path.display());
        get(&eb, &mut w, &arg).unwrap();
        assert_eq!(eb.borrow_mut().buf_mut().getlc(w.cursor()).0, 1);
    }

    #[test]
    fn put_refuses_to_clobber_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exists.txt");
        std::fs::write(&path, "already here").unwrap();
        let eb = filled("new content");
        let result = put(&eb, &path.display().to_string());
        assert!(matches!(result, Err(EditError::FileExists)));
    }

    #[test]
    fn put_with_no_path_and_no_prior_write_fails() {
        let eb = filled("content");
        let result = put(&eb, "");
        assert!(matches!(result, Err(EditError::NoFileToWrite)));
    }

    #[test]
    fn look_wraps_to_start_of_buffer() {
        let eb = filled("fox over the lazy fox\n");
        let mut w = win();
        w.set_cursor(5);
        let pattern: Vec<Rune> = "fox".chars().map(|c| c as Rune).collect();
        look_for(&mut eb.borrow_mut(), &mut w, &pattern).unwrap();
        assert_eq!(w.cursor(), 19);
    }

    #[test]
    fn look_reports_no_match() {
        let eb = filled("nothing here\n");
        let mut w = win();
        let pattern: Vec<Rune> = "xyz".chars().map(|c| c as Rune).collect();
        let result = look_for(&mut eb.borrow_mut(), &mut w, &pattern);
        assert!(matches!(result, Err(EditError::NoMatch)));
    }

    #[test]
    fn new_document_replaces_handle_and_leaves_old_alive_for_holders() {
        let mut eb = filled("stale");
        let old = eb.clone();
        old.borrow_mut().acquire_task_hold();
        new_document(&mut eb, "").unwrap();
        assert_eq!(eb.borrow().buf().len(), 0);
        assert_eq!(old.borrow().buf().len(), 5);
        assert!(old.borrow().is_zombie());
    }

    #[test]
    fn del_window_refuses_last_window() {
        let mut frame = core_model::Frame::new(Rect::new(0, 0, 40, 10));
        frame.add_window();
        let result = del_window(&mut frame, 0);
        assert!(matches!(result, Err(EditError::LastWindow)));
    }
}
