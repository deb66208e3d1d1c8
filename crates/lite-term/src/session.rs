// SPDX-License-Identifier: MIT
//
// Session — one raw-mode ownership of a terminal device.
//
// `enter` saves the device's mode, switches to raw mode, enters the
// alternate screen and allocates a CellBuffer sized to the window. `exit`
// undoes it in reverse order: leave the alternate screen, put the original
// mode back, drop the buffer. `exit` runs from `Drop` as well, so every path
// out of the owner (`?`, early return, unwinding panic) restores the
// terminal. A device failure during any operation tears the session down
// before the error reaches the caller.
//
// Typical loop:
//
// ```no_run
// use lite_term::input::{ctrl, KeyCode};
// use lite_term::session::{Session, SessionConfig};
//
// let mut session = Session::open(SessionConfig::default())?;
// loop {
//     session.refresh()?;
//     if let Some(key) = session.read_key()? {
//         if key.is_ctrl(b'q') {
//             break;
//         }
//     }
//     if session.termination_requested() {
//         break;
//     }
//     session.poll_resize()?;
// }
// session.exit()?;
// # Ok::<(), lite_term::Error>(())
// ```

use std::io;
use std::time::Duration;

use crate::ansi;
use crate::buffer::{CellBuffer, Region};
use crate::cell::{Cell, Style};
use crate::error::{Error, Result};
use crate::input::{ByteSource, Decoder, KeyEvent};
use crate::render::{RenderStats, Renderer};
use crate::terminal::{self, Device, Size};

/// Longest cursor-position reply accepted, terminator excluded.
const MAX_REPLY_LEN: usize = 32;

// ─── SessionConfig ───────────────────────────────────────────────────────────

/// Session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on an idle input read. Also sets the raw-mode `VTIME`.
    pub read_timeout: Duration,
    /// How long to wait for the rest of an escape sequence after ESC.
    pub escape_timeout: Duration,
    /// Longest escape-sequence parameter run the decoder accepts.
    pub max_sequence_len: usize,
    /// Switch to the alternate screen while the session is open.
    pub alternate_screen: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
            escape_timeout: Duration::from_millis(25),
            max_sequence_len: 16,
            alternate_screen: true,
        }
    }
}

impl SessionConfig {
    /// The key decoder these settings describe.
    #[must_use]
    pub const fn decoder(&self) -> Decoder {
        Decoder::new(self.read_timeout, self.escape_timeout, self.max_sequence_len)
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// An open terminal session over device `D`.
pub struct Session<D: Device> {
    device: D,
    config: SessionConfig,
    original: Option<D::Mode>,
    alt_screen: bool,
    buffer: Option<CellBuffer>,
    renderer: Renderer,
    decoder: Decoder,
}

#[cfg(unix)]
impl Session<terminal::Tty> {
    /// Open a session on the controlling terminal.
    ///
    /// The first session installs SIGWINCH, SIGTERM and SIGHUP handlers for
    /// the rest of the process. After that SIGTERM and SIGHUP no longer end
    /// the process by themselves: the owner's loop must poll
    /// [`termination_requested`](Self::termination_requested) and return,
    /// or the program will ignore `kill`.
    ///
    /// # Errors
    ///
    /// [`Error::Device`] if stdin is not a terminal or any setup step fails.
    pub fn open(config: SessionConfig) -> Result<Self> {
        Self::enter(terminal::Tty::new()?, config)
    }
}

impl<D: Device> Session<D> {
    /// Take over `device`.
    ///
    /// On failure everything already done is undone (best effort) and the
    /// setup error is returned. With [`Tty`](terminal::Tty) this installs
    /// the process signal handlers; see [`Session::open`].
    ///
    /// # Errors
    ///
    /// [`Error::Device`] if the mode cannot be read or set, the alternate
    /// screen cannot be entered, or the window size is unavailable or zero.
    pub fn enter(device: D, config: SessionConfig) -> Result<Self> {
        let mut session = Self {
            device,
            config,
            original: None,
            alt_screen: false,
            buffer: None,
            renderer: Renderer::new(),
            decoder: config.decoder(),
        };

        match session.setup() {
            Ok(()) => Ok(session),
            Err(e) => {
                log::debug!("terminal session setup failed: {e}");
                if let Err(teardown) = session.exit() {
                    log::warn!("teardown after failed setup: {teardown}");
                }
                Err(e)
            }
        }
    }

    fn setup(&mut self) -> Result<()> {
        let original = self
            .device
            .get_mode()
            .map_err(|e| Error::device("tcgetattr", e))?;
        let raw = self.device.raw_mode(&original, self.config.read_timeout);
        self.device.guard_mode(&original);
        self.original = Some(original);
        self.device
            .set_mode(&raw)
            .map_err(|e| Error::device("tcsetattr", e))?;

        if self.config.alternate_screen {
            self.alt_screen = true;
            self.emit("enter alternate screen", ansi::enter_alt_screen)?;
        }

        let size = self.query_size()?;
        self.buffer = Some(CellBuffer::new(size.cols, size.rows));
        log::debug!("terminal session entered at {}x{}", size.cols, size.rows);
        Ok(())
    }

    /// Tear the session down: leave the alternate screen, restore the
    /// original mode, release the buffer.
    ///
    /// Every step is attempted even if an earlier one fails. Calling it
    /// again, or on a half-initialised session, does only what is left.
    ///
    /// # Errors
    ///
    /// The first step that failed.
    pub fn exit(&mut self) -> Result<()> {
        let mut first = None;

        if self.alt_screen || self.buffer.is_some() {
            let leave_alt = std::mem::take(&mut self.alt_screen);
            let restored = self.emit("restore screen", |w| {
                ansi::reset(w)?;
                ansi::cursor_show(w)?;
                if leave_alt {
                    ansi::exit_alt_screen(w)?;
                }
                Ok(())
            });
            if let Err(e) = restored {
                log::warn!("could not restore screen: {e}");
                first.get_or_insert(e);
            }
        }

        if let Some(original) = self.original.take() {
            match self.device.set_mode(&original) {
                Ok(()) => self.device.release_guard(),
                Err(e) => {
                    let e = Error::device("tcsetattr", e);
                    log::warn!("could not restore terminal mode: {e}");
                    first.get_or_insert(e);
                }
            }
        }

        if self.buffer.take().is_some() {
            log::debug!("terminal session closed");
        }

        first.map_or(Ok(()), Err)
    }

    /// Whether the session still owns a buffer.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.buffer.is_some()
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub const fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    // ── Size ────────────────────────────────────────────────────────────

    /// The window size as the device reports it now.
    ///
    /// # Errors
    ///
    /// [`Error::Device`] if the query fails or reports a zero dimension;
    /// [`Error::Closed`] after [`exit`](Self::exit).
    pub fn size(&mut self) -> Result<Size> {
        self.ensure_open()?;
        self.query_size()
    }

    fn query_size(&mut self) -> Result<Size> {
        let size = self
            .device
            .window_size()
            .map_err(|e| Error::device("winsize", e))?;
        if size.is_empty() {
            return Err(zero_window("winsize", size));
        }
        Ok(size)
    }

    /// Reallocate the buffer to `cols × rows`. Content is discarded.
    ///
    /// # Errors
    ///
    /// [`Error::Device`] for a zero dimension, [`Error::Closed`] after exit.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        let size = Size { cols, rows };
        if size.is_empty() {
            return Err(zero_window("resize", size));
        }
        self.buffer_mut()?.resize(cols, rows);
        log::debug!("terminal buffer resized to {cols}x{rows}");
        Ok(())
    }

    /// Re-query the window size and reallocate the buffer to match.
    ///
    /// # Errors
    ///
    /// As for [`size`](Self::size). A device failure tears the session down.
    pub fn refresh_size(&mut self) -> Result<Size> {
        self.ensure_open()?;
        let queried = self.query_size();
        let size = self.fatal(queried)?;
        if let Some(buf) = &self.buffer {
            if (buf.width(), buf.height()) == (size.cols, size.rows) {
                return Ok(size);
            }
        }
        self.resize(size.cols, size.rows)?;
        Ok(size)
    }

    /// If a SIGWINCH arrived since the last call, pick up the new size.
    ///
    /// # Errors
    ///
    /// As for [`refresh_size`](Self::refresh_size).
    pub fn poll_resize(&mut self) -> Result<Option<Size>> {
        if terminal::take_resize_pending() {
            return self.refresh_size().map(Some);
        }
        Ok(None)
    }

    /// Whether SIGTERM or SIGHUP arrived. The owner should stop its loop so
    /// the session is torn down normally.
    #[must_use]
    pub fn termination_requested(&self) -> bool {
        terminal::termination_requested()
    }

    // ── Cells ───────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// [`Error::Closed`] after [`exit`](Self::exit).
    pub fn buffer(&self) -> Result<&CellBuffer> {
        self.buffer.as_ref().ok_or(Error::Closed)
    }

    /// # Errors
    ///
    /// [`Error::Closed`] after [`exit`](Self::exit).
    pub fn buffer_mut(&mut self) -> Result<&mut CellBuffer> {
        self.buffer.as_mut().ok_or(Error::Closed)
    }

    /// Write one cell.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] outside the buffer, [`Error::Closed`] after exit.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> Result<()> {
        self.buffer_mut()?.set(x, y, cell)
    }

    /// Read one cell.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] outside the buffer, [`Error::Closed`] after exit.
    pub fn get(&self, x: u16, y: u16) -> Result<Cell> {
        self.buffer()?.get(x, y)
    }

    /// Write a string; see [`CellBuffer::put_str`].
    ///
    /// # Errors
    ///
    /// [`Error::Range`] if `(x, y)` is outside the buffer, [`Error::Closed`]
    /// after exit.
    pub fn put_str(&mut self, x: u16, y: u16, text: &str, style: Style) -> Result<u16> {
        self.buffer_mut()?.put_str(x, y, text, style)
    }

    // ── Output ──────────────────────────────────────────────────────────

    /// Redraw the whole buffer in a single write.
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] if a cell cannot be encoded (nothing is written);
    /// [`Error::Device`] if the write fails or is short, after which the
    /// session has been torn down.
    pub fn refresh(&mut self) -> Result<RenderStats> {
        let region = self.buffer()?.bounds();
        self.refresh_region(region)
    }

    /// Redraw only `region`, in a single write.
    ///
    /// # Errors
    ///
    /// As for [`refresh`](Self::refresh).
    pub fn refresh_region(&mut self, region: Region) -> Result<RenderStats> {
        let buffer = self.buffer.as_ref().ok_or(Error::Closed)?;
        let frame = self.renderer.encode_region(buffer, region)?;
        let written = write_once(&mut self.device, frame, "write");
        self.fatal(written)?;
        Ok(self.renderer.stats())
    }

    // ── Input ───────────────────────────────────────────────────────────

    /// Decode the next key, or `None` if nothing arrived within
    /// `read_timeout`.
    ///
    /// # Errors
    ///
    /// [`Error::Device`] on a read failure, after which the session has been
    /// torn down; [`Error::Closed`] after exit.
    pub fn read_key(&mut self) -> Result<Option<KeyEvent>> {
        self.ensure_open()?;
        let key = self.decoder.read_key(&mut self.device);
        if let Ok(Some(key)) = &key {
            log::trace!("key {key:?}");
        }
        self.fatal(key)
    }

    /// Ask the terminal where its cursor is. Returns 0-based `(col, row)`.
    ///
    /// Reads the reply straight from the input stream, so it must not be
    /// called while keys are expected. Setup and diagnostics only.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the reply is missing, too long or malformed;
    /// [`Error::Device`] if the query cannot be written or read.
    pub fn cursor_position(&mut self) -> Result<(u16, u16)> {
        self.ensure_open()?;
        let sent = self.emit("cursor position query", ansi::request_cursor_position);
        self.fatal(sent)?;

        let mut reply = Vec::with_capacity(MAX_REPLY_LEN);
        loop {
            let read = self.device.read_byte(self.config.read_timeout);
            match self.fatal(read)? {
                Some(b'R') => break,
                Some(b) if reply.len() < MAX_REPLY_LEN => reply.push(b),
                Some(_) => {
                    return Err(Error::Protocol(format!(
                        "cursor position reply longer than {MAX_REPLY_LEN} bytes"
                    )));
                }
                None => {
                    return Err(Error::Protocol("no cursor position reply".into()));
                }
            }
        }

        parse_cursor_reply(&reply)
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn ensure_open(&self) -> Result<()> {
        if self.buffer.is_some() {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    /// Build a short control sequence and write it in one go.
    fn emit(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>,
    ) -> Result<()> {
        let mut seq = Vec::with_capacity(32);
        f(&mut seq).map_err(|e| Error::device(op, e))?;
        write_once(&mut self.device, &seq, op)
    }

    /// Tear down on a device error, then hand the result back.
    fn fatal<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_device() && self.is_active() {
                log::debug!("device failure, closing session: {e}");
                if let Err(teardown) = self.exit() {
                    log::warn!("teardown after device failure: {teardown}");
                }
            }
        }
        result
    }
}

impl<D: Device> Drop for Session<D> {
    fn drop(&mut self) {
        if let Err(e) = self.exit() {
            log::warn!("terminal teardown on drop failed: {e}");
        }
    }
}

/// One device write that must take every byte.
fn write_once<D: Device>(device: &mut D, bytes: &[u8], op: &'static str) -> Result<()> {
    let n = device.write(bytes).map_err(|e| Error::device(op, e))?;
    if n != bytes.len() {
        return Err(Error::device(
            op,
            io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {n} of {} bytes", bytes.len()),
            ),
        ));
    }
    Ok(())
}

fn zero_window(op: &'static str, size: Size) -> Error {
    Error::device(
        op,
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("zero-sized window {}x{}", size.cols, size.rows),
        ),
    )
}

/// Parse `ESC [ row ; col` (the `R` already stripped) into 0-based
/// `(col, row)`.
fn parse_cursor_reply(reply: &[u8]) -> Result<(u16, u16)> {
    let malformed = || Error::Protocol(format!("malformed cursor position reply {reply:?}"));

    let body = reply.strip_prefix(b"\x1b[").ok_or_else(malformed)?;
    let text = std::str::from_utf8(body).map_err(|_| malformed())?;
    let (row, col) = text.split_once(';').ok_or_else(malformed)?;
    let row: u16 = row.parse().map_err(|_| malformed())?;
    let col: u16 = col.parse().map_err(|_| malformed())?;
    if row == 0 || col == 0 {
        return Err(malformed());
    }
    Ok((col - 1, row - 1))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
