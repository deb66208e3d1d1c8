// SPDX-License-Identifier: MIT
//
// lite-term — raw-mode terminal sessions with a styled cell grid.
//
// One session owns the terminal between `enter` and `exit`: raw mode, the
// alternate screen, and a CellBuffer sized to the window. The program writes
// cells, calls `refresh` to paint the whole grid in a single write, and pulls
// decoded keys with `read_key`. Teardown runs on every way out, including
// drop and panic.
//
// Layers, bottom up:
//
//   color, cell    → Color, Attrs, Style, Cell
//   buffer         → CellBuffer, Region
//   ansi, output   → escape writers, byte buffer, tracked terminal state
//   render         → CellBuffer → one frame of bytes
//   input          → bytes → KeyEvent
//   terminal       → Device trait, termios Tty, signal and panic guards
//   session        → Session, SessionConfig

pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod error;
pub mod input;
pub mod output;
pub mod render;
pub mod session;
pub mod terminal;

#[cfg(test)]
mod mock;

pub use buffer::{CellBuffer, Region};
pub use cell::{Attrs, Cell, Style};
pub use color::Color;
pub use error::{Error, Result};
pub use input::{KeyCode, KeyEvent, Modifiers, ctrl};
pub use session::{Session, SessionConfig};
pub use terminal::Size;
