// SPDX-License-Identifier: MIT
//
// Error type shared by every fallible operation in the crate.
//
// Four failure families reach the caller: the terminal device itself
// (termios, ioctl, read, write), a coordinate outside the cell grid, a cell
// whose glyph cannot be put on the wire, and a malformed reply from the
// terminal. None of them are retried here.

use std::io;

use thiserror::Error;

/// Terminal engine error.
#[derive(Error, Debug)]
pub enum Error {
    /// A device operation failed. `op` names the step (`"tcgetattr"`,
    /// `"write"`, `"winsize"`...).
    #[error("terminal device error during {op}: {source}")]
    Device {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// Coordinates outside the cell buffer.
    #[error("cell ({x}, {y}) is outside the {width}x{height} buffer")]
    Range { x: u16, y: u16, width: u16, height: u16 },

    /// A cell holds a code point that has no printable UTF-8 form.
    #[error("cell ({x}, {y}) holds code point U+{code_point:04X} which cannot be encoded")]
    Encoding { x: u16, y: u16, code_point: u32 },

    /// The terminal answered a query with something unexpected.
    #[error("unexpected terminal reply: {0}")]
    Protocol(String),

    /// The session has been torn down; its buffer no longer exists.
    #[error("terminal session is closed")]
    Closed,
}

impl Error {
    /// Wrap an I/O error from the device step `op`.
    #[must_use]
    pub const fn device(op: &'static str, source: io::Error) -> Self {
        Self::Device { op, source }
    }

    /// Whether this is a device-level failure.
    #[must_use]
    pub const fn is_device(&self) -> bool {
        matches!(self, Self::Device { .. })
    }
}

/// Result type for terminal operations.
pub type Result<T> = std::result::Result<T, Error>;

// ─── Tests ───────────────────────────────────────────────────────────────────
