// SPDX-License-Identifier: MIT
//
// Terminal device: termios modes, window size, raw byte I/O, signals.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), poll, read, write and sigaction. These are
// the standard POSIX interfaces for terminal control. Each unsafe block is
// minimal.
//
// `Device` is the seam between the session and the OS. `Tty` implements it
// over stdin/stdout; tests substitute an in-memory device.
//
// The panic hook writes a pre-built restore sequence straight to fd 1 and
// puts the saved termios back before the default hook prints its message,
// so a panic in raw mode still leaves a usable shell. It bypasses Rust's
// stdout lock, which may be held by the frame that panicked.
//
// The SIGTERM / SIGHUP handlers replace the default action: the process no
// longer dies on `kill`. It is up to the owner's loop to check
// `termination_requested` and return.
#![allow(unsafe_code)]

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::input::ByteSource;

// ─── Size ────────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    /// Total number of cells (`cols × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }

    /// Whether either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.cols == 0 || self.rows == 0
    }
}

// ─── Device ──────────────────────────────────────────────────────────────────

/// A terminal the session can drive.
///
/// Methods report raw `io::Error`s; the session attaches the step name.
pub trait Device: ByteSource {
    /// Saved line-discipline settings.
    type Mode: Clone;

    /// Read the current mode.
    ///
    /// # Errors
    ///
    /// The OS refused the query (e.g. the descriptor is not a terminal).
    fn get_mode(&mut self) -> io::Result<Self::Mode>;

    /// Apply `mode`.
    ///
    /// # Errors
    ///
    /// The OS refused the change.
    fn set_mode(&mut self, mode: &Self::Mode) -> io::Result<()>;

    /// Derive raw mode from `original`: no canonical input, no echo, no
    /// signal keys, no output post-processing, 8-bit characters, reads that
    /// return after at most `read_timeout`.
    fn raw_mode(&self, original: &Self::Mode, read_timeout: Duration) -> Self::Mode;

    /// Current window size. May be zero on an unready descriptor.
    ///
    /// # Errors
    ///
    /// The size query failed.
    fn window_size(&mut self) -> io::Result<Size>;

    /// One write attempt. Returns how many bytes were accepted.
    ///
    /// # Errors
    ///
    /// The write failed.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Called once `original` is about to be replaced by raw mode, so the
    /// device can arrange for it to be restored on abnormal exit.
    fn guard_mode(&mut self, _original: &Self::Mode) {}

    /// Called once the original mode has been put back.
    fn release_guard(&mut self) {}
}

// ─── Signals ─────────────────────────────────────────────────────────────────

/// Set by the SIGWINCH handler.
static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);

/// Set by the SIGTERM / SIGHUP handler.
static TERMINATION_REQUESTED: AtomicBool = AtomicBool::new(false);

static SIGNALS_INSTALLED: Once = Once::new();

/// Consume a pending resize notification.
#[must_use]
pub fn take_resize_pending() -> bool {
    RESIZE_PENDING.swap(false, Ordering::Relaxed)
}

/// Whether SIGTERM or SIGHUP has arrived. Sticky.
#[must_use]
pub fn termination_requested() -> bool {
    TERMINATION_REQUESTED.load(Ordering::Relaxed)
}

/// Install the resize and termination handlers (once per process).
///
/// The handlers only store to atomics, which is async-signal-safe. The
/// termination handler replaces the default "die now" action so the owner's
/// loop can notice the flag and tear the session down.
pub fn install_signal_handlers() {
    SIGNALS_INSTALLED.call_once(|| {
        #[cfg(unix)]
        unsafe {
            install_handler(libc::SIGWINCH, on_resize as *const () as usize, libc::SA_RESTART);
            install_handler(libc::SIGTERM, on_terminate as *const () as usize, 0);
            install_handler(libc::SIGHUP, on_terminate as *const () as usize, 0);
        }
    });
}

#[cfg(unix)]
unsafe fn install_handler(sig: libc::c_int, handler: usize, flags: libc::c_int) {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = handler;
        sa.sa_flags = flags;
        libc::sigemptyset(&raw mut sa.sa_mask);
        if libc::sigaction(sig, &raw const sa, std::ptr::null_mut()) != 0 {
            log::warn!("sigaction({sig}) failed: {}", io::Error::last_os_error());
        }
    }
}

#[cfg(unix)]
extern "C" fn on_resize(_sig: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::Relaxed);
}

#[cfg(unix)]
extern "C" fn on_terminate(_sig: libc::c_int) {
    TERMINATION_REQUESTED.store(true, Ordering::Relaxed);
}

// ─── Panic-Safe Restore ──────────────────────────────────────────────────────

/// Original termios for the panic hook, which cannot reach the session.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Reset SGR, show the cursor, leave the alternate screen. Leaving the
/// alternate screen comes last so the shell reappears clean.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[0m\x1b[?25h\x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            original(info);
        }));
    });
}

fn emergency_restore() {
    #[cfg(unix)]
    {
        let armed = TERMIOS_BACKUP
            .lock()
            .map(|mut guard| guard.take())
            .unwrap_or(None);
        if let Some(original) = armed {
            unsafe {
                let _ = libc::write(
                    libc::STDOUT_FILENO,
                    EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
                    EMERGENCY_RESTORE.len(),
                );
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw const original);
            }
        }
    }
}

// ─── Tty ─────────────────────────────────────────────────────────────────────

/// The controlling terminal on stdin (input, modes) and stdout (output,
/// size).
#[cfg(unix)]
#[derive(Debug)]
pub struct Tty {
    input: libc::c_int,
    output: libc::c_int,
}

#[cfg(unix)]
impl Tty {
    /// Attach to stdin/stdout.
    ///
    /// # Errors
    ///
    /// [`Error::Device`] if stdin is not a terminal.
    pub fn new() -> Result<Self> {
        let tty = Self {
            input: libc::STDIN_FILENO,
            output: libc::STDOUT_FILENO,
        };
        if !tty.is_tty() {
            return Err(Error::device(
                "isatty",
                io::Error::new(io::ErrorKind::Unsupported, "stdin is not a terminal"),
            ));
        }
        Ok(tty)
    }

    #[must_use]
    pub fn is_tty(&self) -> bool {
        unsafe { libc::isatty(self.input) != 0 }
    }
}

#[cfg(unix)]
impl ByteSource for Tty {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        let ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd: self.input,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, ms)
        };
        if ready < 0 {
            let e = io::Error::last_os_error();
            // A signal (resize, termination) cut the wait short.
            if e.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(Error::device("poll", e));
        }
        if ready == 0 {
            return Ok(None);
        }

        let mut byte = 0u8;
        let n = unsafe { libc::read(self.input, (&raw mut byte).cast(), 1) };
        match n {
            1 => Ok(Some(byte)),
            0 => Ok(None),
            _ => {
                let e = io::Error::last_os_error();
                if e.kind() == io::ErrorKind::Interrupted {
                    Ok(None)
                } else {
                    Err(Error::device("read", e))
                }
            }
        }
    }
}

#[cfg(unix)]
impl Device for Tty {
    type Mode = libc::termios;

    fn get_mode(&mut self) -> io::Result<libc::termios> {
        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(self.input, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(termios)
        }
    }

    fn set_mode(&mut self, mode: &libc::termios) -> io::Result<()> {
        unsafe {
            if libc::tcsetattr(self.input, libc::TCSAFLUSH, mode) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    fn raw_mode(&self, original: &libc::termios, read_timeout: Duration) -> libc::termios {
        let mut raw = *original;
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = deciseconds(read_timeout);
        raw
    }

    fn window_size(&mut self) -> io::Result<Size> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::ioctl(self.output, libc::TIOCGWINSZ, &raw mut ws) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        loop {
            let n = unsafe { libc::write(self.output, bytes.as_ptr().cast(), bytes.len()) };
            if let Ok(n) = usize::try_from(n) {
                return Ok(n);
            }
            let e = io::Error::last_os_error();
            if e.kind() != io::ErrorKind::Interrupted {
                return Err(e);
            }
        }
    }

    fn guard_mode(&mut self, original: &libc::termios) {
        install_panic_hook();
        install_signal_handlers();
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(*original);
        }
    }

    fn release_guard(&mut self) {
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
    }
}

/// `VTIME` units, rounded up and clamped to what the field holds. A nonzero
/// timeout never becomes 0, which would make reads return immediately.
#[allow(clippy::cast_possible_truncation)] // Clamped to u8::MAX first.
fn deciseconds(timeout: Duration) -> u8 {
    let ds = timeout.as_millis().div_ceil(100);
    ds.min(u128::from(u8::MAX)) as u8
}

// ─── Tests ───────────────────────────────────────────────────────────────────
