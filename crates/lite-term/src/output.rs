// SPDX-License-Identifier: MIT
//
// Output buffering and stateful style tracking.
//
// Two pieces work together to keep a frame small and atomic:
//
//   OutputBuffer: a growable byte buffer that accumulates the whole frame so
//   it can be handed to the device in a single write. There is no fixed
//   ceiling; a large terminal simply makes the buffer grow.
//
//   RendererState: what the renderer believes the terminal currently has
//   (cursor row and column, foreground, background, attributes). Each slot
//   may be unknown, in which case the next cell states it explicitly. The
//   state is rebuilt from scratch at the start of every pass.

use std::io::{self, Write};

use unicode_width::UnicodeWidthChar;

use crate::ansi;
use crate::cell::{Attrs, Style};
use crate::color::Color;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

const DEFAULT_CAPACITY: usize = 16_384;

/// Accumulates escape sequences and glyph bytes for one frame.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

impl OutputBuffer {
    /// An empty buffer with 16 KB preallocated.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a character as UTF-8.
    #[inline]
    pub fn push_char(&mut self, ch: char) {
        let mut enc = [0u8; 4];
        self.buf
            .extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
    }

    /// Drop the contents, keep the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RendererState ───────────────────────────────────────────────────────────

/// The renderer's model of the terminal during one pass.
///
/// `cursor_col` becomes unknown after a zero-width glyph, since terminals
/// disagree on whether such a glyph advances the cursor. Colors and
/// attributes are unknown until the first cell of a pass sets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererState {
    cursor_row: u16,
    cursor_col: Option<u16>,
    fg: Option<Color>,
    bg: Option<Color>,
    attrs: Option<Attrs>,
}

impl RendererState {
    /// State right after the cursor was sent home: position known, style
    /// unknown.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor_row: 0,
            cursor_col: Some(0),
            fg: None,
            bg: None,
            attrs: None,
        }
    }

    #[allow(clippy::missing_const_for_fn)] // *self = Self::new() isn't const-evaluable.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    #[must_use]
    pub const fn cursor_row(&self) -> u16 {
        self.cursor_row
    }

    #[inline]
    #[must_use]
    pub const fn cursor_col(&self) -> Option<u16> {
        self.cursor_col
    }

    /// Whether the glyph just written already covers column `x` of row `y`.
    /// True for the right half of a wide character.
    #[inline]
    #[must_use]
    pub fn covers(&self, x: u16, y: u16) -> bool {
        self.cursor_row == y && self.cursor_col.is_some_and(|c| c > x)
    }

    /// Put the cursor at `(x, y)` with the cheapest sequence.
    ///
    /// Nothing if it is already there; `\r\n` for column 0 of the next row;
    /// absolute CUP for every other jump.
    pub fn move_to(&mut self, out: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
        if self.cursor_row == y && self.cursor_col == Some(x) {
            return Ok(());
        }
        if x == 0 && y == self.cursor_row.wrapping_add(1) && y != 0 {
            ansi::next_line(out)?;
        } else {
            ansi::cursor_to(out, x, y)?;
        }
        self.cursor_row = y;
        self.cursor_col = Some(x);
        Ok(())
    }

    /// Emit whatever is needed to make `style` current.
    ///
    /// Colors are written when they differ from the tracked value; `Inherit`
    /// never produces output and leaves the tracked value alone. Attribute
    /// changes go out as a single CSI group.
    pub fn apply_style(&mut self, out: &mut impl Write, style: Style) -> io::Result<()> {
        if let Color::Rgb(r, g, b) = style.fg() {
            if self.fg != Some(style.fg()) {
                ansi::fg(out, r, g, b)?;
                self.fg = Some(style.fg());
            }
        }

        if let Color::Rgb(r, g, b) = style.bg() {
            if self.bg != Some(style.bg()) {
                ansi::bg(out, r, g, b)?;
                self.bg = Some(style.bg());
            }
        }

        if self.attrs != Some(style.attrs()) {
            ansi::attr_transition(out, self.attrs, style.attrs())?;
            self.attrs = Some(style.attrs());
        }

        Ok(())
    }

    /// Emit SGR 0. Colors become the terminal defaults, which no `Rgb`
    /// value matches, and attributes become known to be all off.
    pub fn reset_style(&mut self, out: &mut impl Write) -> io::Result<()> {
        ansi::reset(out)?;
        self.fg = None;
        self.bg = None;
        self.attrs = Some(Attrs::empty());
        Ok(())
    }

    /// Write one glyph at the current cursor and advance by its display
    /// width.
    pub fn put_glyph(&mut self, out: &mut OutputBuffer, ch: char) {
        out.push_char(ch);
        let width = ch.width().unwrap_or(0);
        self.cursor_col = match width {
            0 => None,
            #[allow(clippy::cast_possible_truncation)] // width is 1 or 2.
            w => self.cursor_col.map(|c| c.saturating_add(w as u16)),
        };
    }
}

impl Default for RendererState {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
