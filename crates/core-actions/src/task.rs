//! Shell-pipe integration: spawning `/bin/sh -c cmd` and wiring its
//! stdin/stdout into the event loop as an async task bound to an `EBuf`
//! (spec.md §4.6's "optional leading `<`/`>`/`\|`").
//!
//! Grounded on `original_source/exec.c`'s `Run` struct and `runev`
//! callback, with one deliberate correction: `exec.c` opens a third pipe
//! for the child's stderr and closes its read end unused (`/* XXX errors
//! ignored... */`), silently discarding it. spec.md §4.6 requires stdout
//! and stderr to be genuinely merged, so this tree never opens a separate
//! stderr pipe at all — `pre_exec` dup2s fd 2 onto fd 1 before the child
//! execs, the same plumbing a shell's own `2>&1` would produce.

use crate::EBufHandle;
use anyhow::{Context, Result};
use core_events::{EventLoop, Interest};
use core_model::Window;
use core_state::{SEL_BEG, SEL_END};
use core_text::{Rune, decode};
use std::cell::RefCell;
use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::rc::Rc;
use tracing::trace;

/// The leading redirection character on a shell-escape command line
/// (`exec.c`'s `run`, `ctyp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeMode {
    /// `>cmd`: command output is appended after the command line.
    Append,
    /// `<cmd`: the selection is deleted and replaced by the command's
    /// stdin (nothing of its own is read back).
    Replace,
    /// `|cmd`: the selection is sent to the command's stdin and replaced
    /// by its output.
    Filter,
    /// A bare command line: run for effect only, output appended after
    /// the command line (same placement as `Append`, no selection
    /// involved).
    Bare,
}

impl PipeMode {
    fn from_char(c: Option<char>) -> PipeMode {
        match c {
            Some('>') => PipeMode::Append,
            Some('<') => PipeMode::Replace,
            Some('|') => PipeMode::Filter,
            _ => PipeMode::Bare,
        }
    }
}

/// One outstanding `/bin/sh -c` invocation (`exec.c`'s `Run`).
struct Task {
    /// `None` once stdout has hit EOF (`exec.c`'s `rn->eb = 0`).
    eb: Option<EBufHandle>,
    /// Next insertion offset for decoded stdout runes.
    pos: usize,
    /// Bytes still owed to the child's stdin, and how many have gone so
    /// far (`exec.c`'s `ob`/`snt`).
    send_buf: Vec<u8>,
    send_pos: usize,
    /// Tail of an undecoded trailing UTF-8 sequence carried to the next
    /// read (`exec.c`'s `in[8]`/`nin`).
    partial: Vec<u8>,
    child: Child,
    read_done: bool,
    write_done: bool,
}

pub type TaskHandle = Rc<RefCell<Task>>;

/// Live tasks, kept alive only so their `Child` is reaped on completion
/// (the event loop, not this table, drives each task's callbacks).
#[derive(Default)]
pub struct TaskTable {
    tasks: Vec<TaskHandle>,
}

impl TaskTable {
    pub fn new() -> Self {
        TaskTable::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn reap_finished(&mut self) {
        self.tasks.retain(|t| {
            let done = t.borrow().read_done && t.borrow().write_done;
            if done {
                let _ = t.borrow_mut().child.wait();
            }
            !done
        });
    }
}

/// Spawn `body` as `/bin/sh -c body`, wiring it into `events` per `mode`.
/// `eol` is the offset one past the end of the command's own line, where
/// `Append`/`Bare` output lands.
pub fn spawn_shell(
    eb: &mut EBufHandle,
    win: &mut Window,
    eol: usize,
    ctyp: Option<char>,
    body: &str,
    events: &mut EventLoop,
    tasks: &mut TaskTable,
) -> Result<()> {
    tasks.reap_finished();
    let mode = PipeMode::from_char(ctyp);

    let (s0, s1) = match mode {
        PipeMode::Bare | PipeMode::Append => (win.cursor(), win.cursor()),
        PipeMode::Replace | PipeMode::Filter => {
            let mut e = eb.borrow_mut();
            let beg = e.getmark(SEL_BEG);
            let end = e.getmark(SEL_END);
            match (beg, end) {
                (Some(b), Some(e2)) if e2 > b => (b, e2),
                _ => (win.cursor(), win.cursor()),
            }
        }
    };

    let (insert_pos, send_bytes, clear_selection) = {
        let mut e = eb.borrow_mut();
        match mode {
            PipeMode::Append | PipeMode::Bare => (eol + 1, None, false),
            PipeMode::Replace => {
                e.del(s0, s1);
                (s0, None, s0 != s1)
            }
            PipeMode::Filter => {
                let mut ybuf = Vec::new();
                e.yank(s0, s1, &mut ybuf);
                let text: String = ybuf.into_iter().filter_map(char::from_u32).collect();
                e.del(s0, s1);
                (s0, Some(text.into_bytes()), s0 != s1)
            }
        }
    };

    if clear_selection {
        let mut e = eb.borrow_mut();
        e.setmark(SEL_BEG, usize::MAX);
        e.setmark(SEL_END, usize::MAX);
    }
    eb.borrow_mut().commit();

    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(body);
    cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
    // Genuinely merge stderr into stdout, unlike exec.c's discard-and-
    // ignore third pipe: dup2 runs after stdio redirection but before
    // exec, so it clobbers whatever fd 2 was just set to.
    unsafe {
        cmd.pre_exec(|| {
            if libc::dup2(1, 2) < 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
    let mut child = cmd.spawn().context("cannot exec")?;

    let stdout_fd = child.stdout.as_ref().expect("piped").as_raw_fd();
    let stdin_fd = child.stdin.as_ref().map(|s| s.as_raw_fd());
    // The stderr pipe end is never read; it is dup2'd away inside the
    // child before exec, so drop our copy to avoid leaking the fd.
    drop(child.stderr.take());

    eb.borrow_mut().acquire_task_hold();

    let task = Rc::new(RefCell::new(Task {
        eb: Some(eb.clone()),
        pos: insert_pos,
        send_buf: send_bytes.clone().unwrap_or_default(),
        send_pos: 0,
        partial: Vec::new(),
        child,
        read_done: false,
        write_done: send_bytes.is_none(),
    }));
    tasks.tasks.push(task.clone());

    let read_task = task.clone();
    events.register(
        stdout_fd,
        Interest::READ,
        Box::new(move |events, fd, _ready| on_readable(&read_task, events, fd)),
    );

    match (stdin_fd, send_bytes) {
        (Some(fd), Some(_)) => {
            let write_task = task.clone();
            events.register(
                fd,
                Interest::WRITE,
                Box::new(move |events, fd, _ready| on_writable(&write_task, events, fd)),
            );
        }
        _ => {
            // Nothing to send: close stdin immediately so the child sees
            // EOF right away (exec.c's `close(pin[1])` when `ob == 0`).
            drop(task.borrow_mut().child.stdin.take());
        }
    }

    trace!(target: "actions.task", ?mode, stdout_fd, "spawned");
    Ok(())
}

fn on_readable(task: &TaskHandle, events: &mut EventLoop, fd: RawFd) {
    let mut t = task.borrow_mut();
    let Some(eb) = t.eb.clone() else { return };

    if eb.borrow().is_zombie() {
        // The document was killed mid-command: abort reading into a
        // dead buffer rather than keep inserting where no one will ever
        // see it (exec.c's own comment names this option explicitly).
        events.cancel(fd);
        t.eb = None;
        t.read_done = true;
        eb.borrow_mut().release_task_hold();
        return;
    }

    let mut chunk = [0u8; 2048];
    let mut buf = Vec::with_capacity(t.partial.len() + chunk.len());
    buf.extend_from_slice(&t.partial);
    let n = t.child.stdout.as_mut().expect("registered while piped").read(&mut chunk);
    let n = match n {
        Ok(0) | Err(_) => {
            events.cancel(fd);
            t.eb = None;
            t.read_done = true;
            eb.borrow_mut().release_task_hold();
            return;
        }
        Ok(n) => n,
    };
    buf.extend_from_slice(&chunk[..n]);

    let p0 = t.pos;
    let mut off = 0usize;
    {
        let mut e = eb.borrow_mut();
        while off < buf.len() {
            match decode(&buf[off..]) {
                Some((r, len)) => {
                    e.ins(t.pos, r);
                    t.pos += 1;
                    off += len;
                }
                None => break,
            }
        }
        e.setmark(SEL_BEG, p0);
        e.setmark(SEL_END, t.pos);
        e.commit();
    }
    t.partial = buf[off..].to_vec();
}

fn on_writable(task: &TaskHandle, events: &mut EventLoop, fd: RawFd) {
    let mut t = task.borrow_mut();
    let remaining = &t.send_buf[t.send_pos..];
    if remaining.is_empty() {
        events.cancel(fd);
        drop(t.child.stdin.take());
        t.write_done = true;
        return;
    }
    let written = t.child.stdin.as_mut().expect("registered while piped").write(remaining);
    match written {
        Ok(0) | Err(_) => {
            events.cancel(fd);
            drop(t.child.stdin.take());
            t.write_done = true;
        }
        Ok(n) => t.send_pos += n,
    }
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
    fn bare_command_drains_stdout_into_buffer() {
        let mut eb = filled("echo hi\n");
        let mut w = win();
        w.set_cursor(0);
        let mut events = EventLoop::new();
        let mut tasks = TaskTable::new();
        spawn_shell(&mut eb, &mut w, 7, None, "echo hi", &mut events, &mut tasks).unwrap();
        assert_eq!(tasks.len(), 1);
        for _ in 0..20 {
            events.step().unwrap();
            tasks.reap_finished();
            if tasks.is_empty() {
                break;
            }
        }
        let text: String =
            (0..eb.borrow_mut().buf().len()).map(|i| eb.borrow_mut().buf_mut().get(i)).filter_map(char::from_u32).collect();
        assert!(text.contains("hi"));
    }

    #[test]
    fn filter_mode_sends_selection_and_replaces_it() {
        let mut eb = filled("ABC\n");
        eb.borrow_mut().setmark(SEL_BEG, 0);
        eb.borrow_mut().setmark(SEL_END, 3);
        let mut w = win();
        w.set_cursor(0);
        let mut events = EventLoop::new();
        let mut tasks = TaskTable::new();
        spawn_shell(&mut eb, &mut w, 3, Some('|'), "tr a-z A-Z", &mut events, &mut tasks).unwrap();
        assert_eq!(eb.borrow_mut().buf().len(), 1); // "ABC" deleted, leaves "\n"
        for _ in 0..50 {
            events.step().unwrap();
            tasks.reap_finished();
            if tasks.is_empty() {
                break;
            }
        }
        let text: String =
            (0..eb.borrow_mut().buf().len()).map(|i| eb.borrow_mut().buf_mut().get(i)).filter_map(char::from_u32).collect();
        assert!(text.starts_with("ABC"));
    }
}
