//! Top-level dispatcher (spec component C8, spec.md §4.8): owns the
//! current window, wires the GUI collaborator's fd into the event loop,
//! and coalesces redraws.
//!
//! Grounded on `original_source/main.c`'s trivial loop (`GResize` ->
//! `win_resize_frame`, `GKey` -> `cmd_parse` + cursor-visibility-driven
//! `show_cursor` + `win_redraw_frame`), generalized to also route mouse
//! events to the command layer's `run_at_cursor`/`look_at_cursor` (Acme's
//! real middle/right-click bindings, which this tree's excerpt of
//! `cmd.c`/`x11.c` never itself wires up — `exec.c`'s `ex_run`/`ex_look`
//! are declared for exactly this external caller).

use anyhow::{Context, Result};
use clap::Parser;
use core_actions::task::TaskTable;
use core_actions::{EBufHandle, cmdlayer, new_handle, ops};
use core_events::{EventLoop, Interest};
use core_keymap::{KeyParser, Outcome};
use core_model::{Frame, Rect};
use core_render::RenderState;
use core_state::EBuf;
use core_terminal::{CrosstermBackend, CrosstermSurface, GButton, GEvent, GuiSurface, TerminalBackend};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Once;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// One fractional `FSCALE`-wide window fills the whole frame at startup.
const FULL_WIDTH_VFRAC: u32 = core_model::FSCALE;
/// Redraw coalescing interval (spec.md §4.8 "coalesce redraw requests");
/// no donor constant names this, ~60Hz is the conventional choice.
const REDRAW_COALESCE_MS: u64 = 16;

#[derive(Parser, Debug)]
#[command(name = "ed", version, about = "A modeless, Acme-inspired text editor")]
struct Args {
    /// Optional `path[:line]` to open at startup.
    file: Option<String>,
}

fn parse_file_arg(arg: &str) -> (PathBuf, usize) {
    match arg.rsplit_once(':') {
        Some((path, lineno)) if !path.is_empty() => {
            let ln: i64 = lineno.parse().unwrap_or(1);
            (PathBuf::from(path), if ln < 1 { 1 } else { ln as usize })
        }
        _ => (PathBuf::from(arg), 1),
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = std::path::Path::new(".");
    let file_appender = tracing_appender::rolling::never(log_dir, "edit.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

/// Everything the GUI-fd callback and the redraw alarm both need to
/// reach (spec.md §4.8's single current-window pointer, generalized to
/// the handful of pieces of state this dispatcher actually owns).
struct App {
    surface: CrosstermSurface,
    frame: Frame,
    eb: EBufHandle,
    parser: KeyParser,
    tasks: TaskTable,
    render: RenderState,
    redraw_due: bool,
}

impl App {
    fn current_window_idx(&self) -> usize {
        self.frame.focus()
    }

    fn draw(&mut self) -> Result<()> {
        let len = self.eb.borrow().buf().len();
        let revision = self.eb.borrow().revision();
        {
            let mut e = self.eb.borrow_mut();
            self.frame.ensure_all_layouts(|i| e.buf_mut().get(i), len, revision);
        }
        let focus = self.current_window_idx();
        let insert_mode = self.parser.in_insert_mode();
        let mut e = self.eb.borrow_mut();
        core_render::redraw(&mut self.surface, &self.frame, &mut e, focus, insert_mode, &mut self.render)?;
        Ok(())
    }

    fn handle_resize(&mut self, w: usize, h: usize) {
        self.frame.resize_frame(w, h);
        self.render.invalidate_all();
        self.redraw_due = true;
    }

    fn handle_key(&mut self, rune: core_text::Rune) -> bool {
        let idx = self.current_window_idx();
        let outcome = {
            let mut e = self.eb.borrow_mut();
            let win = self.frame.window_mut(idx).expect("focus is always a valid window index");
            self.parser.handle_key(rune, &mut e, win)
        };
        match outcome {
            Outcome::Exit => return true,
            Outcome::Error(msg) => {
                warn!(target: "actions.cmd", msg, "erroneous command");
                let p0 = self.frame.window(idx).expect("valid").cursor();
                cmdlayer::report_error(&self.eb, p0, msg);
            }
            Outcome::Command(pc) => {
                let main_c = pc.main.c;
                let handled = {
                    let mut e = self.eb.borrow_mut();
                    let win = self.frame.window_mut(idx).expect("valid");
                    ops::apply_operator(&mut e, win, pc)
                };
                if !handled {
                    debug!(target: "actions.cmd", cmd = main_c, "unhandled parsed command");
                    let p0 = self.frame.window(idx).expect("valid").cursor();
                    cmdlayer::report_error(&self.eb, p0, &core_state::EditError::ErroneousCommand.to_string());
                }
            }
            Outcome::Moved { .. } | Outcome::ModeChanged | Outcome::None => {}
        }
        self.scroll_into_view();
        self.redraw_due = true;
        false
    }

    fn scroll_into_view(&mut self) {
        let idx = self.current_window_idx();
        let len = self.eb.borrow().buf().len();
        let revision = self.eb.borrow().revision();
        let mut e = self.eb.borrow_mut();
        let win = self.frame.window_mut(idx).expect("valid");
        if !win.cursor_visible() {
            win.ensure_layout(|i| e.buf_mut().get(i), len, revision);
            win.show_cursor(|i| e.buf_mut().get(i), |p| e.buf_mut().bol(p), core_model::CursorLoc::Mid);
        }
    }

    fn handle_execute(&mut self, x: usize, y: usize, events: &mut EventLoop) {
        let Some(idx) = self.frame.which(x, y) else { return };
        self.frame.set_focus(idx);
        let pos = {
            let rect = self.frame.window(idx).expect("valid").rect;
            let len = self.eb.borrow().buf().len();
            let revision = self.eb.borrow().revision();
            let mut e = self.eb.borrow_mut();
            let win = self.frame.window_mut(idx).expect("valid");
            win.ensure_layout(|i| e.buf_mut().get(i), len, revision);
            win.at(|i| e.buf_mut().get(i), x.saturating_sub(rect.x), y.saturating_sub(rect.y))
        };
        self.frame.window_mut(idx).expect("valid").set_cursor(pos);
        if let Err(err) = cmdlayer::run_at_cursor(&mut self.eb, &mut self.frame, idx, events, &mut self.tasks) {
            warn!(target: "actions.cmd", %err, "command failed");
            cmdlayer::report_error(&self.eb, pos, &err.to_string());
        }
        self.redraw_due = true;
    }

    fn handle_look(&mut self, x: usize, y: usize) {
        let Some(idx) = self.frame.which(x, y) else { return };
        self.frame.set_focus(idx);
        let pos = {
            let rect = self.frame.window(idx).expect("valid").rect;
            let len = self.eb.borrow().buf().len();
            let revision = self.eb.borrow().revision();
            let mut e = self.eb.borrow_mut();
            let win = self.frame.window_mut(idx).expect("valid");
            win.ensure_layout(|i| e.buf_mut().get(i), len, revision);
            win.at(|i| e.buf_mut().get(i), x.saturating_sub(rect.x), y.saturating_sub(rect.y))
        };
        let win = self.frame.window_mut(idx).expect("valid");
        if let Err(err) = cmdlayer::look_at_cursor(&self.eb, win, pos) {
            warn!(target: "actions.cmd", %err, "look failed");
            cmdlayer::report_error(&self.eb, pos, &err.to_string());
        }
        self.redraw_due = true;
    }
}

fn drain_gui_events(app: &Rc<RefCell<App>>, events: &mut EventLoop) {
    loop {
        let next = app.borrow_mut().surface.nextevent();
        let event = match next {
            Ok(Some(e)) => e,
            Ok(None) => break,
            Err(err) => {
                warn!(target: "terminal.io", %err, "nextevent failed");
                break;
            }
        };
        match event {
            GEvent::Resize { w, h } => app.borrow_mut().handle_resize(w, h),
            GEvent::Key { rune } => {
                let exit = app.borrow_mut().handle_key(rune);
                if exit {
                    events.exit();
                    return;
                }
            }
            GEvent::MouseDown { button: GButton::Middle, x, y } => app.borrow_mut().handle_execute(x, y, events),
            GEvent::MouseDown { button: GButton::Right, x, y } => app.borrow_mut().handle_look(x, y),
            GEvent::MouseDown { .. } | GEvent::MouseUp { .. } | GEvent::MouseSelect { .. } => {}
        }
    }
}

fn arm_redraw_alarm(events: &mut EventLoop, app: &Rc<RefCell<App>>) {
    let app = app.clone();
    if let Err(err) = events.alarm(REDRAW_COALESCE_MS, Box::new(move || app.borrow_mut().redraw_due = true)) {
        warn!(target: "events.loop", %err, "failed to arm redraw alarm");
    }
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let mut eb = EBuf::new();
    if let Some(arg) = &args.file {
        let (path, line) = parse_file_arg(arg);
        match eb.read_from_path(&path) {
            Ok(()) => info!(target: "runtime", path = %path.display(), "opened"),
            Err(err) => warn!(target: "runtime", %err, path = %path.display(), "cannot open file, starting empty"),
        }
        let _ = line; // applied to the window's cursor once it exists, below
    }

    let mut backend = CrosstermBackend::new();
    backend.set_title("ed").ok();
    let _guard = backend.enter_guard()?;

    let (cols, rows) = crossterm::terminal::size().context("cannot query terminal size")?;
    let mut frame = Frame::new(Rect::new(0, 0, cols as usize, rows as usize));
    frame.add_window();
    frame.windows_mut()[0].vfrac = FULL_WIDTH_VFRAC;

    if let Some(arg) = &args.file {
        let (_, line) = parse_file_arg(arg);
        let pos = eb.buf_mut().setlc(line.saturating_sub(1), 0);
        frame.windows_mut()[0].set_cursor(pos);
    }

    let mut surface = CrosstermSurface::new();
    let gui_fd = surface.init()?;

    let app = Rc::new(RefCell::new(App {
        surface,
        frame,
        eb: new_handle(eb),
        parser: KeyParser::new(),
        tasks: TaskTable::new(),
        render: RenderState::new(),
        redraw_due: true,
    }));

    let mut events = EventLoop::new();
    {
        let app = app.clone();
        events.register(
            gui_fd,
            Interest::READ,
            Box::new(move |events, _fd, _ready| drain_gui_events(&app, events)),
        );
    }

    app.borrow_mut().draw()?;
    arm_redraw_alarm(&mut events, &app);

    while events.step()? {
        let due = app.borrow().redraw_due;
        if due {
            app.borrow_mut().redraw_due = false;
            app.borrow_mut().draw()?;
            arm_redraw_alarm(&mut events, &app);
        }
    }

    app.borrow_mut().surface.fini()?;
    info!(target: "runtime", "shutdown");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_file_arg_splits_trailing_line_number() {
        let (path, line) = parse_file_arg("notes.txt:42");
        assert_eq!(path, PathBuf::from("notes.txt"));
        assert_eq!(line, 42);
    }

    #[test]
    fn parse_file_arg_defaults_to_line_one_without_suffix() {
        let (path, line) = parse_file_arg("notes.txt");
        assert_eq!(path, PathBuf::from("notes.txt"));
        assert_eq!(line, 1);
    }

    #[test]
    fn parse_file_arg_defaults_to_line_one_on_non_numeric_suffix() {
        let (path, line) = parse_file_arg("src/main.rs:notaline");
        assert_eq!(path, PathBuf::from("src/main.rs"));
        assert_eq!(line, 1);
    }
}
