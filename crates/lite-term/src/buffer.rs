// SPDX-License-Identifier: MIT
//
// CellBuffer — the in-memory grid the caller paints and the renderer reads.
//
// Flat `Vec<Cell>` in row-major order: `index = y * width + x`. Rows are
// contiguous, so the renderer's left-to-right scan is linear in memory.
//
// Every access is bounds-checked and out-of-range coordinates are rejected
// with `Error::Range`. Nothing is clamped: a caller that computes a bad
// column hears about it instead of overwriting the wrong cell.

use unicode_width::UnicodeWidthChar;

use crate::cell::{Cell, Style};
use crate::error::{Error, Result};

// ─── Region ──────────────────────────────────────────────────────────────────

/// A rectangle of cells, used for partial refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// A single row, `x..x + width`.
    #[inline]
    #[must_use]
    pub const fn row(y: u16, x: u16, width: u16) -> Self {
        Self::new(x, y, width, 1)
    }

    /// Exclusive right edge.
    #[inline]
    #[must_use]
    pub const fn right(self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> u16 {
        self.y.saturating_add(self.height)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersect with a `width × height` grid anchored at the origin.
    /// `None` if nothing is left.
    #[must_use]
    pub fn clip(self, width: u16, height: u16) -> Option<Self> {
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        if self.x >= right || self.y >= bottom {
            return None;
        }
        Some(Self::new(self.x, self.y, right - self.x, bottom - self.y))
    }
}

// ─── CellBuffer ──────────────────────────────────────────────────────────────

/// The grid of styled cells for one terminal screen.
///
/// ```
/// use lite_term::buffer::CellBuffer;
/// use lite_term::cell::{Cell, Style};
///
/// let mut buf = CellBuffer::new(80, 24);
/// buf.set(5, 3, Cell::new('X', Style::DEFAULT))?;
/// assert_eq!(buf.get(5, 3)?.character(), Some('X'));
/// assert!(buf.get(80, 0).is_err());
/// # Ok::<(), lite_term::Error>(())
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CellBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl CellBuffer {
    /// A `width × height` buffer of blank cells.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; usize::from(width) * usize::from(height)],
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// The whole buffer as a [`Region`].
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn check(&self, x: u16, y: u16) -> Result<usize> {
        if self.in_bounds(x, y) {
            Ok(self.index(x, y))
        } else {
            Err(Error::Range {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// The cell at `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] if `(x, y)` is outside the buffer.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Result<Cell> {
        let i = self.check(x, y)?;
        Ok(self.cells[i])
    }

    /// Replace the cell at `(x, y)`. Glyph and style are written together.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] if `(x, y)` is outside the buffer; nothing is written.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> Result<()> {
        let i = self.check(x, y)?;
        self.cells[i] = cell;
        Ok(())
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// One row, or `None` past the bottom.
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y >= self.height {
            return None;
        }
        let start = self.index(0, y);
        Some(&self.cells[start..start + usize::from(self.width)])
    }

    /// Reset every cell to [`Cell::BLANK`].
    pub fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    /// Fill every cell with a space in `style`.
    pub fn fill(&mut self, style: Style) {
        self.cells.fill(Cell::BLANK.with_style(style));
    }

    /// Reallocate to `width × height`. All content is discarded.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells
            .resize(usize::from(width) * usize::from(height), Cell::BLANK);
    }

    /// Write `text` left to right starting at `(x, y)`, all in `style`.
    ///
    /// Zero-width characters are skipped. A wide character takes two cells,
    /// the second one a continuation cell; if it would straddle the right
    /// edge a space is written instead. Text past the right edge is dropped.
    /// Returns the number of columns written.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] if `(x, y)` itself is outside the buffer.
    pub fn put_str(&mut self, x: u16, y: u16, text: &str, style: Style) -> Result<u16> {
        self.check(x, y)?;

        let mut col = x;
        for ch in text.chars() {
            if col >= self.width {
                break;
            }

            let w = ch.width().unwrap_or(0);
            if w == 0 {
                continue;
            }

            let i = self.index(col, y);
            if w == 2 {
                if col + 1 >= self.width {
                    self.cells[i] = Cell::BLANK.with_style(style);
                    col += 1;
                    break;
                }
                self.cells[i] = Cell::new(ch, style);
                self.cells[i + 1] = Cell::continuation(style);
                col += 2;
            } else {
                self.cells[i] = Cell::new(ch, style);
                col += 1;
            }
        }

        Ok(col - x)
    }
}

impl std::fmt::Debug for CellBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CellBuffer({}x{})", self.width, self.height)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Attrs;
    use crate::color::Color;
    use pretty_assertions::assert_eq;

    fn styled() -> Style {
        Style::new(Color::Rgb(10, 20, 30), Color::Inherit).with_attrs(Attrs::BOLD)
    }

    // ── Region ──────────────────────────────────────────────────────────

    #[test]
    fn region_contains_edges() {
        let r = Region::new(2, 3, 4, 2);
        assert!(r.contains(2, 3));
        assert!(r.contains(5, 4));
        assert!(!r.contains(6, 3));
        assert!(!r.contains(2, 5));
        assert!(!r.contains(1, 3));
    }

    #[test]
    fn region_clip_to_grid() {
        assert_eq!(
            Region::new(70, 20, 20, 10).clip(80, 24),
            Some(Region::new(70, 20, 10, 4))
        );
        assert_eq!(Region::new(80, 0, 5, 5).clip(80, 24), None);
        assert_eq!(Region::new(0, 0, 0, 5).clip(80, 24), None);
    }

    #[test]
    fn region_row_helper() {
        let r = Region::row(4, 10, 5);
        assert_eq!(r, Region::new(10, 4, 5, 1));
        assert!(!r.is_empty());
        assert!(Region::new(0, 0, 3, 0).is_empty());
    }

    // ── Construction ────────────────────────────────────────────────────

    #[test]
    fn new_is_blank() {
        let buf = CellBuffer::new(10, 4);
        assert_eq!(buf.cells().len(), 40);
        assert!(buf.cells().iter().all(|c| *c == Cell::BLANK));
        assert_eq!(buf.bounds(), Region::new(0, 0, 10, 4));
    }

    // ── set / get ───────────────────────────────────────────────────────

    #[test]
    fn set_then_get_returns_same_cell() {
        let mut buf = CellBuffer::new(80, 24);
        let cell = Cell::new('Q', styled());
        for &(x, y) in &[(0, 0), (79, 0), (0, 23), (79, 23), (40, 12)] {
            buf.set(x, y, cell).unwrap();
            assert_eq!(buf.get(x, y).unwrap(), cell);
        }
    }

    #[test]
    fn set_does_not_touch_neighbours() {
        let mut buf = CellBuffer::new(5, 3);
        buf.set(2, 1, Cell::new('x', styled())).unwrap();
        assert_eq!(buf.get(1, 1).unwrap(), Cell::BLANK);
        assert_eq!(buf.get(3, 1).unwrap(), Cell::BLANK);
        assert_eq!(buf.get(2, 0).unwrap(), Cell::BLANK);
        assert_eq!(buf.get(2, 2).unwrap(), Cell::BLANK);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut buf = CellBuffer::new(80, 24);
        let before = buf.clone();
        let cell = Cell::new('!', styled());

        for &(x, y) in &[(80, 0), (0, 24), (u16::MAX, u16::MAX), (80, 24)] {
            let err = buf.set(x, y, cell).unwrap_err();
            assert!(matches!(
                err,
                Error::Range { width: 80, height: 24, .. }
            ));
            assert!(matches!(buf.get(x, y), Err(Error::Range { .. })));
        }
        assert_eq!(buf, before, "rejected writes must not modify the buffer");
    }

    #[test]
    fn row_slices() {
        let mut buf = CellBuffer::new(3, 2);
        buf.set(1, 1, Cell::new('m', Style::DEFAULT)).unwrap();
        let row = buf.row(1).unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row[1].character(), Some('m'));
        assert!(buf.row(2).is_none());
    }

    // ── clear / fill / resize ───────────────────────────────────────────

    #[test]
    fn clear_and_fill() {
        let mut buf = CellBuffer::new(4, 2);
        buf.fill(styled());
        assert!(buf.cells().iter().all(|c| c.style() == styled()));
        assert!(buf.cells().iter().all(|c| c.character() == Some(' ')));
        buf.clear();
        assert!(buf.cells().iter().all(|c| *c == Cell::BLANK));
    }

    #[test]
    fn resize_reinitialises() {
        let mut buf = CellBuffer::new(4, 2);
        buf.set(0, 0, Cell::new('z', styled())).unwrap();
        buf.resize(6, 3);
        assert_eq!((buf.width(), buf.height()), (6, 3));
        assert_eq!(buf.cells().len(), 18);
        assert!(buf.cells().iter().all(|c| *c == Cell::BLANK));
        assert!(buf.get(5, 2).is_ok());
        assert!(buf.get(6, 0).is_err());
    }

    // ── put_str ─────────────────────────────────────────────────────────

    #[test]
    fn put_str_ascii() {
        let mut buf = CellBuffer::new(10, 1);
        let n = buf.put_str(1, 0, "abc", styled()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(buf.get(0, 0).unwrap(), Cell::BLANK);
        assert_eq!(buf.get(1, 0).unwrap(), Cell::new('a', styled()));
        assert_eq!(buf.get(3, 0).unwrap(), Cell::new('c', styled()));
        assert_eq!(buf.get(4, 0).unwrap(), Cell::BLANK);
    }

    #[test]
    fn put_str_truncates_at_edge() {
        let mut buf = CellBuffer::new(4, 1);
        let n = buf.put_str(2, 0, "hello", Style::DEFAULT).unwrap();
        assert_eq!(n, 2);
        assert_eq!(buf.get(3, 0).unwrap().character(), Some('e'));
    }

    #[test]
    fn put_str_wide_writes_continuation() {
        let mut buf = CellBuffer::new(6, 1);
        let n = buf.put_str(0, 0, "中a", Style::DEFAULT).unwrap();
        assert_eq!(n, 3);
        assert_eq!(buf.get(0, 0).unwrap().character(), Some('中'));
        assert!(buf.get(1, 0).unwrap().is_continuation());
        assert_eq!(buf.get(2, 0).unwrap().character(), Some('a'));
    }

    #[test]
    fn put_str_wide_at_edge_becomes_space() {
        let mut buf = CellBuffer::new(3, 1);
        let n = buf.put_str(2, 0, "中", styled()).unwrap();
        assert_eq!(n, 1);
        assert_eq!(buf.get(2, 0).unwrap(), Cell::BLANK.with_style(styled()));
    }

    #[test]
    fn put_str_skips_zero_width() {
        let mut buf = CellBuffer::new(5, 1);
        let n = buf.put_str(0, 0, "a\u{200B}b", Style::DEFAULT).unwrap();
        assert_eq!(n, 2);
        assert_eq!(buf.get(1, 0).unwrap().character(), Some('b'));
    }

    #[test]
    fn put_str_out_of_range_start() {
        let mut buf = CellBuffer::new(5, 2);
        assert!(matches!(
            buf.put_str(0, 2, "x", Style::DEFAULT),
            Err(Error::Range { x: 0, y: 2, .. })
        ));
        assert!(buf.put_str(5, 0, "x", Style::DEFAULT).is_err());
    }

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", CellBuffer::new(80, 24)), "CellBuffer(80x24)");
    }
}
