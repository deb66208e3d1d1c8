// SPDX-License-Identifier: MIT
//
// Cell colors.
//
// Truecolor only. A channel is either an explicit 24-bit RGB value or
// `Inherit`, which leaves whatever color the terminal currently has on that
// channel untouched. No palette indices and no color-space math: the
// highlighter hands over resolved colors.

/// Foreground or background color of a cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// 24-bit truecolor, emitted as `SGR 38;2` / `48;2`.
    Rgb(u8, u8, u8),
    /// Keep the terminal's current color for this channel.
    #[default]
    Inherit,
}

impl Color {
    /// Build a color from a packed `0xRRGGBB` value.
    ///
    /// ```
    /// use lite_term::color::Color;
    ///
    /// assert_eq!(Color::hex(0x7aa2f7), Color::Rgb(0x7a, 0xa2, 0xf7));
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Each channel is masked to 8 bits.
    pub const fn hex(rgb: u32) -> Self {
        Self::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Whether this is [`Color::Inherit`].
    #[inline]
    #[must_use]
    pub const fn is_inherit(self) -> bool {
        matches!(self, Self::Inherit)
    }
}

impl std::fmt::Debug for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Inherit => write!(f, "Inherit"),
        }
    }
}
