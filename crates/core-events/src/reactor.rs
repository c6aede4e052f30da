//! Single-threaded, cooperative, level-triggered event loop (spec component
//! C4, spec.md §4.4) built on `poll(2)`.
//!
//! Grounded on `original_source/evnt.c`'s `ev_register`/`ev_cancel`/
//! `ev_alarm`/`ev_loop`, redesigned per spec.md §4.4/§5: the original's
//! `select(2)` + raw `fd_set` is replaced with `libc::poll`, and the C
//! callback's `void *p` user pointer is replaced by closures capturing
//! their own state (idiomatic Rust, no `user: *mut c_void` field needed).
//! `register`/`cancel` semantics (deferred structural change, fds fire in
//! registration order, alarms before fds in a pass) are carried unchanged.

use crate::alarm::{AlarmCallback, AlarmHeap};
use crate::error::EventError;
use bitflags::bitflags;
use std::os::unix::io::RawFd;
use std::time::Instant;
use tracing::trace;

bitflags! {
    /// Readiness interest for a registered fd. Spec.md §4.4's `{Read, Write}`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Interest: u8 {
        const READ = 0b01;
        const WRITE = 0b10;
    }
}

impl Interest {
    fn to_poll_events(self) -> libc::c_short {
        let mut ev: i32 = 0;
        if self.contains(Interest::READ) {
            ev |= libc::POLLIN as i32;
        }
        if self.contains(Interest::WRITE) {
            ev |= libc::POLLOUT as i32;
        }
        ev as libc::c_short
    }

    fn from_poll_revents(revents: libc::c_short) -> Interest {
        let revents = revents as i32;
        let readable = libc::POLLIN as i32 | libc::POLLHUP as i32 | libc::POLLERR as i32;
        let writable = libc::POLLOUT as i32 | libc::POLLERR as i32;
        let mut interest = Interest::empty();
        if revents & readable != 0 {
            interest |= Interest::READ;
        }
        if revents & writable != 0 {
            interest |= Interest::WRITE;
        }
        interest
    }
}

pub type FdCallback = Box<dyn FnMut(&mut EventLoop, RawFd, Interest)>;

struct Source {
    fd: RawFd,
    interest: Interest,
    callback: Option<FdCallback>,
    removed: bool,
}

const DEFAULT_TIMEOUT_MS: i32 = 10_000;

/// The loop's own clock and wait primitive plus the registered fds/alarms.
///
/// Every `register`/`cancel`/`alarm` call issued from *within* a callback
/// (i.e. while `dispatching` is true) is buffered until the current pass
/// ends, per spec.md §4.4: "structural changes take effect at the end of
/// the current pass."
pub struct EventLoop {
    sources: Vec<Source>,
    alarms: AlarmHeap,
    exiting: bool,
    now_ms: u64,
    epoch: Instant,
    dispatching: bool,
    pending_cancels: Vec<RawFd>,
    pending_registers: Vec<Source>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        EventLoop {
            sources: Vec::new(),
            alarms: AlarmHeap::new(),
            exiting: false,
            now_ms: 0,
            epoch: Instant::now(),
            dispatching: false,
            pending_cancels: Vec::new(),
            pending_registers: Vec::new(),
        }
    }

    /// Monotonic current tick (milliseconds since the loop started), cached
    /// per loop iteration (spec.md §4.4 `now()`).
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    fn refresh_now(&mut self) {
        self.now_ms = self.epoch.elapsed().as_millis() as u64;
    }

    /// Add a source. `interest` is a subset of `{Read, Write}`.
    pub fn register(&mut self, fd: RawFd, interest: Interest, callback: FdCallback) {
        let source = Source { fd, interest, callback: Some(callback), removed: false };
        if self.dispatching {
            self.pending_registers.push(source);
        } else {
            trace!(target: "events.loop", fd, "fd_registered");
            self.sources.push(source);
        }
    }

    /// Mark the source for removal; the loop compacts after the current
    /// dispatch pass.
    pub fn cancel(&mut self, fd: RawFd) {
        if self.dispatching {
            self.pending_cancels.push(fd);
            return;
        }
        for source in &mut self.sources {
            if source.fd == fd {
                source.removed = true;
            }
        }
        self.compact();
    }

    /// Schedule a one-shot timer `ms` milliseconds from now. A fixed maximum
    /// number of alarms (`MAX_ALARMS`) may be live at once.
    pub fn alarm(&mut self, ms: u64, callback: AlarmCallback) -> Result<(), EventError> {
        let deadline = self.now_ms.saturating_add(ms);
        self.alarms.push(deadline, callback)?;
        Ok(())
    }

    /// Request that `run()` return after the current pass.
    pub fn exit(&mut self) {
        self.exiting = true;
    }

    fn compact(&mut self) {
        self.sources.retain(|s| !s.removed);
    }

    fn apply_pending(&mut self) {
        for fd in self.pending_cancels.drain(..) {
            for source in &mut self.sources {
                if source.fd == fd {
                    source.removed = true;
                }
            }
        }
        self.compact();
        for source in self.pending_registers.drain(..) {
            trace!(target: "events.loop", fd = source.fd, "fd_registered");
            self.sources.push(source);
        }
    }

    /// Run one build-wait-dispatch pass. Returns `false` once `exit()` has
    /// been called and the caller should stop looping.
    pub fn step(&mut self) -> Result<bool, EventError> {
        if self.exiting {
            return Ok(false);
        }

        self.refresh_now();

        let mut pollfds: Vec<libc::pollfd> = self
            .sources
            .iter()
            .filter(|s| !s.removed)
            .map(|s| libc::pollfd { fd: s.fd, events: s.interest.to_poll_events(), revents: 0 })
            .collect();

        let timeout_ms = match self.alarms.next_deadline() {
            Some(deadline) => deadline.saturating_sub(self.now_ms).min(i32::MAX as u64) as i32,
            None => DEFAULT_TIMEOUT_MS,
        };

        let rc = unsafe {
            libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout_ms)
        };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                self.refresh_now();
                return Ok(!self.exiting);
            }
            return Err(EventError::Poll(err));
        }

        self.refresh_now();
        self.dispatching = true;

        self.alarms.fire_due(self.now_ms);

        // Fds fire in registration order. A source may appear at a
        // different index than its pollfd slot once removals are pending,
        // so match by fd rather than assuming parallel indices.
        let revents_by_fd: Vec<(RawFd, libc::c_short)> =
            pollfds.iter().map(|p| (p.fd, p.revents)).collect();

        for i in 0..self.sources.len() {
            if self.sources[i].removed {
                continue;
            }
            let fd = self.sources[i].fd;
            let revents = revents_by_fd
                .iter()
                .find(|(f, _)| *f == fd)
                .map(|(_, r)| *r)
                .unwrap_or(0);
            let ready = Interest::from_poll_revents(revents) & self.sources[i].interest;
            if ready.is_empty() {
                continue;
            }
            if let Some(mut cb) = self.sources[i].callback.take() {
                trace!(target: "events.loop", fd, ?ready, "fd_dispatch");
                cb(self, fd, ready);
                if let Some(slot) = self.sources.get_mut(i) {
                    if !slot.removed {
                        slot.callback = Some(cb);
                    }
                }
            }
        }

        self.dispatching = false;
        self.apply_pending();

        Ok(!self.exiting)
    }

    /// Until `exit()` is called, build the readiness set, block with a
    /// timeout equal to the earliest alarm's remaining time (or ~10s if
    /// none), dispatch due alarms, then dispatch ready fds in registration
    /// order.
    pub fn run(&mut self) -> Result<(), EventError> {
        while self.step()? {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pipe() -> (RawFd, RawFd) {
        let mut fds = [0; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0);
        (fds[0], fds[1])
    }

    fn raw_write(fd: RawFd, bytes: &[u8]) {
        let n = unsafe { libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len()) };
        assert_eq!(n, bytes.len() as isize);
    }

    fn raw_read(fd: RawFd, buf: &mut [u8]) -> usize {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        assert!(n >= 0);
        n as usize
    }

    #[test]
    fn dispatches_read_ready_fd() {
        let (r, w) = pipe();
        let mut ev = EventLoop::new();
        let got = Rc::new(RefCell::new(Vec::new()));
        {
            let got = got.clone();
            ev.register(
                r,
                Interest::READ,
                Box::new(move |evloop, fd, interest| {
                    assert!(interest.contains(Interest::READ));
                    let mut buf = [0u8; 16];
                    let n = raw_read(fd, &mut buf);
                    got.borrow_mut().extend_from_slice(&buf[..n]);
                    evloop.cancel(fd);
                    evloop.exit();
                }),
            );
        }
        raw_write(w, b"hi");
        ev.run().unwrap();
        assert_eq!(*got.borrow(), b"hi");
        unsafe {
            libc::close(r);
            libc::close(w);
        }
    }

    #[test]
    fn alarms_fire_before_fds_in_same_pass() {
        let (r, w) = pipe();
        let mut ev = EventLoop::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        {
            let order = order.clone();
            ev.alarm(0, Box::new(move || order.borrow_mut().push("alarm"))).unwrap();
        }
        {
            let order = order.clone();
            ev.register(
                r,
                Interest::READ,
                Box::new(move |evloop, fd, _| {
                    order.borrow_mut().push("fd");
                    evloop.cancel(fd);
                    evloop.exit();
                }),
            );
        }
        raw_write(w, b"x");
        ev.run().unwrap();
        assert_eq!(*order.borrow(), vec!["alarm", "fd"]);
        unsafe {
            libc::close(r);
            libc::close(w);
        }
    }

    #[test]
    fn cancel_during_callback_is_deferred_until_pass_end() {
        let (r, w) = pipe();
        let mut ev = EventLoop::new();
        let calls = Rc::new(RefCell::new(0));
        {
            let calls = calls.clone();
            ev.register(
                r,
                Interest::READ,
                Box::new(move |evloop, fd, _| {
                    *calls.borrow_mut() += 1;
                    evloop.cancel(fd);
                    evloop.exit();
                }),
            );
        }
        assert_eq!(ev.sources.len(), 1);
        raw_write(w, b"y");
        ev.run().unwrap();
        assert_eq!(*calls.borrow(), 1);
        assert!(ev.sources.is_empty());
        unsafe {
            libc::close(r);
            libc::close(w);
        }
    }

    #[test]
    fn register_full_alarm_queue_returns_error() {
        use crate::alarm::MAX_ALARMS;
        let mut ev = EventLoop::new();
        for _ in 0..MAX_ALARMS {
            ev.alarm(1_000, Box::new(|| {})).unwrap();
        }
        assert!(ev.alarm(1_000, Box::new(|| {})).is_err());
    }
}
