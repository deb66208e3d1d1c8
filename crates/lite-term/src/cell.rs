// SPDX-License-Identifier: MIT
//
// Cell and Style — what one screen position looks like.
//
// A Cell pairs a glyph with a Style. The glyph is kept as a raw code point
// rather than a `char` so that a bad value coming from upstream (a
// highlighter, a decoder, a file) survives until the renderer, which then
// reports exactly which cell could not be encoded instead of silently
// printing a replacement character.
//
// Wide characters (CJK, some emoji) occupy two columns. The first cell
// holds the code point; the second is a continuation cell (glyph = 0) that
// the renderer skips when it directly follows its wide character.

use crate::color::Color;

// ─── Attributes ──────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes as a compact bitfield.
    ///
    /// ```
    /// use lite_term::cell::Attrs;
    ///
    /// let a = Attrs::BOLD | Attrs::ITALIC;
    /// assert!(a.contains(Attrs::BOLD));
    /// assert!(!a.contains(Attrs::BLINK));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attrs: u8 {
        /// SGR 1 / 22.
        const BOLD          = 1 << 0;
        /// SGR 3 / 23.
        const ITALIC        = 1 << 1;
        /// SGR 4 / 24.
        const UNDERLINE     = 1 << 2;
        /// SGR 5 / 25.
        const BLINK         = 1 << 3;
        /// SGR 7 / 27. Swaps foreground and background.
        const INVERSE       = 1 << 4;
        /// SGR 9 / 29.
        const STRIKETHROUGH = 1 << 5;
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Foreground, background and attributes for one cell.
///
/// Immutable once built: the `with_*` methods return a modified copy.
///
/// ```
/// use lite_term::cell::{Attrs, Style};
/// use lite_term::color::Color;
///
/// let base = Style::new(Color::hex(0xc0caf5), Color::hex(0x1a1b26));
/// let keyword = base.with_attrs(Attrs::BOLD);
/// assert_eq!(base.attrs(), Attrs::empty());
/// assert_eq!(keyword.fg(), base.fg());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    fg: Color,
    bg: Color,
    attrs: Attrs,
}

impl Style {
    /// Inherit on both channels, no attributes.
    pub const DEFAULT: Self = Self {
        fg: Color::Inherit,
        bg: Color::Inherit,
        attrs: Attrs::empty(),
    };

    /// A style with explicit colors and no attributes.
    #[inline]
    #[must_use]
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self {
            fg,
            bg,
            attrs: Attrs::empty(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_fg(self, fg: Color) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: Color) -> Self {
        Self { bg, ..self }
    }

    /// Replace the attribute set.
    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attrs) -> Self {
        Self { attrs, ..self }
    }

    /// Add attributes to the existing set.
    #[inline]
    #[must_use]
    pub const fn add_attrs(self, attrs: Attrs) -> Self {
        Self {
            attrs: self.attrs.union(attrs),
            ..self
        }
    }

    #[inline]
    #[must_use]
    pub const fn fg(self) -> Color {
        self.fg
    }

    #[inline]
    #[must_use]
    pub const fn bg(self) -> Color {
        self.bg
    }

    #[inline]
    #[must_use]
    pub const fn attrs(self) -> Attrs {
        self.attrs
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// Continuation marker: the second column of a wide character.
const CONTINUATION: u32 = 0;

const SPACE: u32 = b' ' as u32;

/// A single screen position: one glyph and its style.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    glyph: u32,
    style: Style,
}

impl Cell {
    /// A space with the default style. Fresh buffers are filled with this.
    pub const BLANK: Self = Self {
        glyph: SPACE,
        style: Style::DEFAULT,
    };

    #[inline]
    #[must_use]
    pub const fn new(ch: char, style: Style) -> Self {
        Self {
            glyph: ch as u32,
            style,
        }
    }

    /// A cell from a raw code point. No validation happens here; an invalid
    /// value is reported by the renderer as an encoding error.
    #[inline]
    #[must_use]
    pub const fn from_code_point(code_point: u32, style: Style) -> Self {
        Self {
            glyph: code_point,
            style,
        }
    }

    /// The second column of a wide character.
    #[inline]
    #[must_use]
    pub const fn continuation(style: Style) -> Self {
        Self {
            glyph: CONTINUATION,
            style,
        }
    }

    /// Same glyph, different style.
    #[inline]
    #[must_use]
    pub const fn with_style(self, style: Style) -> Self {
        Self { style, ..self }
    }

    /// Raw code point (`0` for continuation cells).
    #[inline]
    #[must_use]
    pub const fn glyph(self) -> u32 {
        self.glyph
    }

    #[inline]
    #[must_use]
    pub const fn style(self) -> Style {
        self.style
    }

    /// The glyph as a `char`, or `None` for continuation cells and invalid
    /// code points.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.glyph == CONTINUATION {
            None
        } else {
            char::from_u32(self.glyph)
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.glyph == CONTINUATION
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.character() {
            Some(ch) => write!(f, "Cell({ch:?}")?,
            None if self.is_continuation() => write!(f, "Cell(<cont>")?,
            None => write!(f, "Cell(U+{:04X}", self.glyph)?,
        }
        write!(f, " {:?}/{:?}", self.style.fg, self.style.bg)?;
        if !self.style.attrs.is_empty() {
            write!(f, " {:?}", self.style.attrs)?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── Attrs ───────────────────────────────────────────────────────────

    #[test]
    fn attr_bits_match_wire_order() {
        assert_eq!(Attrs::BOLD.bits(), 1);
        assert_eq!(Attrs::ITALIC.bits(), 2);
        assert_eq!(Attrs::UNDERLINE.bits(), 4);
        assert_eq!(Attrs::BLINK.bits(), 8);
        assert_eq!(Attrs::INVERSE.bits(), 16);
        assert_eq!(Attrs::STRIKETHROUGH.bits(), 32);
        assert_eq!(Attrs::all().bits(), 0b0011_1111);
    }

    // ── Style ───────────────────────────────────────────────────────────

    #[test]
    fn default_style_inherits() {
        let s = Style::default();
        assert_eq!(s, Style::DEFAULT);
        assert!(s.fg().is_inherit());
        assert!(s.bg().is_inherit());
        assert!(s.attrs().is_empty());
    }

    #[test]
    fn with_methods_leave_original_untouched() {
        let base = Style::new(Color::Rgb(1, 2, 3), Color::Inherit);
        let bold = base.with_attrs(Attrs::BOLD);
        let red = base.with_fg(Color::Rgb(255, 0, 0));

        assert_eq!(base.attrs(), Attrs::empty());
        assert_eq!(base.fg(), Color::Rgb(1, 2, 3));
        assert_eq!(bold.attrs(), Attrs::BOLD);
        assert_eq!(red.fg(), Color::Rgb(255, 0, 0));
        assert_eq!(red.bg(), Color::Inherit);
    }

    #[test]
    fn add_attrs_unions() {
        let s = Style::DEFAULT
            .with_attrs(Attrs::BOLD)
            .add_attrs(Attrs::UNDERLINE);
        assert_eq!(s.attrs(), Attrs::BOLD | Attrs::UNDERLINE);
    }

    // ── Cell ────────────────────────────────────────────────────────────

    #[test]
    fn blank_is_space_with_default_style() {
        assert_eq!(Cell::BLANK.character(), Some(' '));
        assert_eq!(Cell::BLANK.style(), Style::DEFAULT);
        assert_eq!(Cell::default(), Cell::BLANK);
    }

    #[test]
    fn new_stores_code_point() {
        let c = Cell::new('é', Style::DEFAULT);
        assert_eq!(c.glyph(), 0xE9);
        assert_eq!(c.character(), Some('é'));
        assert!(!c.is_continuation());
    }

    #[test]
    fn invalid_code_point_is_kept_raw() {
        let c = Cell::from_code_point(0xD800, Style::DEFAULT);
        assert_eq!(c.glyph(), 0xD800);
        assert_eq!(c.character(), None);
        assert!(!c.is_continuation());
    }

    #[test]
    fn continuation_has_no_character() {
        let c = Cell::continuation(Style::DEFAULT);
        assert!(c.is_continuation());
        assert_eq!(c.character(), None);
    }

    #[test]
    fn with_style_keeps_glyph() {
        let s = Style::DEFAULT.with_attrs(Attrs::INVERSE);
        let c = Cell::new('x', Style::DEFAULT).with_style(s);
        assert_eq!(c.character(), Some('x'));
        assert_eq!(c.style(), s);
    }

    #[test]
    fn debug_shows_glyph_and_colors() {
        let c = Cell::new('a', Style::new(Color::Rgb(255, 0, 0), Color::Inherit));
        assert_eq!(format!("{c:?}"), "Cell('a' #ff0000/Inherit)");
        let bad = Cell::from_code_point(0x11_0000, Style::DEFAULT);
        assert_eq!(format!("{bad:?}"), "Cell(U+110000 Inherit/Inherit)");
    }
}
