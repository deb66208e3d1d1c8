// SPDX-License-Identifier: MIT
//
// Renderer — turns a CellBuffer into one frame of escape sequences.
//
// Every pass redraws the requested cells in full. There is no memory of the
// previous frame; the savings come from RendererState, which skips cursor
// moves and SGR codes the terminal would not notice. The frame is wrapped in
// save-cursor / hide-cursor ... restore-cursor / show-cursor so the user's
// cursor is left where it was.
//
// Each pass starts with SGR 0 after homing the cursor. Whatever colors the
// previous frame left active are gone, so an `Inherit` channel always means
// the terminal default at the start of a pass and an unchanged buffer
// repaints to the same screen.
//
// Encoding is all-or-nothing: if any cell in the pass holds a glyph that
// cannot be written, the partial frame is discarded and the caller gets
// `Error::Encoding` with nothing handed to the device.

use crate::ansi;
use crate::buffer::{CellBuffer, Region};
use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::output::{OutputBuffer, RendererState};

/// Counters for the last encoded frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Cells visited.
    pub cells: usize,
    /// Bytes in the frame.
    pub bytes: usize,
}

/// Frame encoder. Owns its output buffer so the allocation is reused
/// across frames.
#[derive(Default)]
pub struct Renderer {
    out: OutputBuffer,
    state: RendererState,
    stats: RenderStats,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats for the most recent successful encode.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Encode every cell of `buffer`.
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] for the first cell whose glyph is not a
    /// printable Unicode scalar value.
    pub fn encode(&mut self, buffer: &CellBuffer) -> Result<&[u8]> {
        self.encode_region(buffer, buffer.bounds())
    }

    /// Encode only the cells inside `region`, clipped to the buffer.
    /// An empty intersection still yields the cursor wrapper.
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] as for [`encode`](Self::encode).
    pub fn encode_region(&mut self, buffer: &CellBuffer, region: Region) -> Result<&[u8]> {
        self.out.clear();
        self.state.reset();
        self.stats = RenderStats::default();

        if let Err(e) = self.encode_cells(buffer, region) {
            self.out.clear();
            return Err(e);
        }

        self.stats.bytes = self.out.len();
        log::trace!(
            "encoded frame: {} cells, {} bytes",
            self.stats.cells,
            self.stats.bytes
        );
        Ok(self.out.as_bytes())
    }

    fn encode_cells(&mut self, buffer: &CellBuffer, region: Region) -> Result<()> {
        let out = &mut self.out;
        let state = &mut self.state;

        ansi::cursor_save(out).map_err(write_err)?;
        ansi::cursor_hide(out).map_err(write_err)?;
        ansi::cursor_home(out).map_err(write_err)?;
        state.reset_style(out).map_err(write_err)?;

        if let Some(area) = region.clip(buffer.width(), buffer.height()) {
            for y in area.y..area.bottom() {
                for x in area.x..area.right() {
                    let cell = buffer.get(x, y)?;
                    self.stats.cells += 1;

                    if cell.is_continuation() {
                        if state.covers(x, y) {
                            continue;
                        }
                        state.move_to(out, x, y).map_err(write_err)?;
                        state.apply_style(out, cell.style()).map_err(write_err)?;
                        state.put_glyph(out, ' ');
                        continue;
                    }

                    let ch = printable(cell, x, y)?;
                    state.move_to(out, x, y).map_err(write_err)?;
                    state.apply_style(out, cell.style()).map_err(write_err)?;
                    state.put_glyph(out, ch);
                }
            }
        }

        ansi::cursor_restore(out).map_err(write_err)?;
        ansi::cursor_show(out).map_err(write_err)?;
        Ok(())
    }
}

/// The cell's glyph as a `char` that is safe to put on the wire.
fn printable(cell: Cell, x: u16, y: u16) -> Result<char> {
    match cell.character() {
        Some(ch) if !ch.is_control() => Ok(ch),
        _ => Err(Error::Encoding {
            x,
            y,
            code_point: cell.glyph(),
        }),
    }
}

/// Writes into an `OutputBuffer` cannot fail; this only satisfies the
/// `io::Write` signature.
#[allow(clippy::needless_pass_by_value)]
fn write_err(e: std::io::Error) -> Error {
    Error::device("encode", e)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
