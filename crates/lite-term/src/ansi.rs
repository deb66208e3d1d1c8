// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state
// and no decisions about when to emit; that is the renderer's job. This
// module only knows the byte-level encoding of each command.
//
// Cursor positions are 0-indexed in our API and converted to the 1-indexed
// form the terminal expects.

use std::io::{self, Write};

use crate::cell::Attrs;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to column `x`, row `y` (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Move the cursor to the top-left corner.
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[H")
}

/// Save the cursor position (SCOSC).
#[inline]
pub fn cursor_save(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[s")
}

/// Restore the cursor position saved by [`cursor_save`] (SCORC).
#[inline]
pub fn cursor_restore(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[u")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Carriage return plus line feed: column 0 of the next row.
#[inline]
pub fn next_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\r\n")
}

/// Device Status Report: ask the terminal where the cursor is.
/// The reply is `ESC [ row ; col R`.
#[inline]
pub fn request_cursor_position(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[6n")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC private mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Leave the alternate screen and restore the original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

/// Reset all SGR state (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── Color ───────────────────────────────────────────────────────────────────

/// Set a truecolor foreground (SGR 38;2).
#[inline]
pub fn fg(w: &mut impl Write, r: u8, g: u8, b: u8) -> io::Result<()> {
    write!(w, "\x1b[38;2;{r};{g};{b}m")
}

/// Set a truecolor background (SGR 48;2).
#[inline]
pub fn bg(w: &mut impl Write, r: u8, g: u8, b: u8) -> io::Result<()> {
    write!(w, "\x1b[48;2;{r};{g};{b}m")
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// SGR parameters per attribute: `(flag, set, unset)`.
pub const ATTR_CODES: [(Attrs, u8, u8); 6] = [
    (Attrs::BOLD, 1, 22),
    (Attrs::ITALIC, 3, 23),
    (Attrs::UNDERLINE, 4, 24),
    (Attrs::BLINK, 5, 25),
    (Attrs::INVERSE, 7, 27),
    (Attrs::STRIKETHROUGH, 9, 29),
];

/// Emit the attribute changes from `from` to `to` as one CSI group.
///
/// Only bits that differ produce a parameter. With `from = None` the
/// terminal's attributes are unknown, so every bit is stated explicitly.
/// Writes nothing when there is no change.
///
/// ```
/// use lite_term::ansi::attr_transition;
/// use lite_term::cell::Attrs;
///
/// let mut out = Vec::new();
/// attr_transition(&mut out, Some(Attrs::ITALIC), Attrs::BOLD)?;
/// assert_eq!(out, b"\x1b[1;23m");
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn attr_transition(w: &mut impl Write, from: Option<Attrs>, to: Attrs) -> io::Result<()> {
    let changed = from.map_or(Attrs::all(), |prev| prev.symmetric_difference(to));
    if changed.is_empty() {
        return Ok(());
    }

    w.write_all(b"\x1b[")?;
    let mut first = true;
    for (flag, set, unset) in ATTR_CODES {
        if !changed.contains(flag) {
            continue;
        }
        if !first {
            w.write_all(b";")?;
        }
        let code = if to.contains(flag) { set } else { unset };
        write!(w, "{code}")?;
        first = false;
    }
    w.write_all(b"m")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
