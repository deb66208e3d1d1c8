// SPDX-License-Identifier: MIT
//
// Input decoder.
//
// Pulls bytes one at a time from a `ByteSource` and turns them into key
// events. Plain bytes pass through untouched, including control bytes:
// deciding that 0x11 means "quit" is the caller's business (see `ctrl`).
// Escape sequences are recognised by a small state machine:
//
//   Idle ──ESC──▶ SawEscape ──'['──▶ Csi ──final──▶ dispatch
//                          ├─'O'──▶ Ss3 ──final──▶ dispatch
//                          ├─timeout──▶ Escape
//                          └─other──▶ Alt + byte
//
// ESC is ambiguous (a key on its own, or the start of a sequence), so every
// read after it is bounded by `escape_timeout`. A sequence that stalls, runs
// past `max_sequence_len` bytes, or ends in a final byte we do not know
// collapses to a bare Escape. An overlong sequence is drained through its
// final byte (at most `MAX_DISCARD` bytes) so its tail never reads as keys.
//
// xterm encodes modifiers as a second parameter, `1 + bitmask`:
// `ESC [ 1 ; 5 A` is Ctrl+Up, `ESC [ 3 ; 2 ~` is Shift+Delete.

use std::time::Duration;

use bitflags::bitflags;

use crate::error::Result;

const ESC: u8 = 0x1b;

/// Most bytes skipped while draining an overlong CSI sequence.
const MAX_DISCARD: usize = 256;

// ─── Byte Source ─────────────────────────────────────────────────────────────

/// Something the decoder can pull raw input bytes from.
pub trait ByteSource {
    /// Read one byte, waiting at most `timeout`. `Ok(None)` means nothing
    /// arrived in time.
    ///
    /// # Errors
    ///
    /// A device error from the underlying read.
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;
}

// ─── Event Types ─────────────────────────────────────────────────────────────

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A raw input byte: printable ASCII, a control byte, or one byte of a
    /// UTF-8 sequence.
    Byte(u8),
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
}

bitflags! {
    /// Modifier keys, in xterm's bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
    }
}

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key with no modifiers.
    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn with(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// Whether this is the control byte for `letter`, unmodified.
    ///
    /// ```
    /// use lite_term::input::{KeyCode, KeyEvent};
    ///
    /// assert!(KeyEvent::plain(KeyCode::Byte(0x11)).is_ctrl(b'q'));
    /// ```
    #[inline]
    #[must_use]
    pub fn is_ctrl(self, letter: u8) -> bool {
        self.modifiers.is_empty() && self.code == KeyCode::Byte(ctrl(letter))
    }
}

/// The byte a terminal sends for Ctrl + `key`.
///
/// ```
/// assert_eq!(lite_term::input::ctrl(b'q'), 0x11);
/// assert_eq!(lite_term::input::ctrl(b'Q'), 0x11);
/// ```
#[inline]
#[must_use]
pub const fn ctrl(key: u8) -> u8 {
    key & 0x1f
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

enum State {
    Idle,
    SawEscape,
    Csi(Vec<u8>),
    Ss3,
}

/// Key decoder. Stateless between calls: every `read_key` starts in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    /// How long to wait for the first byte of a key.
    pub idle_timeout: Duration,
    /// How long to wait for each byte after an ESC.
    pub escape_timeout: Duration,
    /// Longest parameter run accepted inside a CSI sequence.
    pub max_sequence_len: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(100),
            escape_timeout: Duration::from_millis(25),
            max_sequence_len: 16,
        }
    }
}

impl Decoder {
    #[must_use]
    pub const fn new(idle_timeout: Duration, escape_timeout: Duration, max_sequence_len: usize) -> Self {
        Self {
            idle_timeout,
            escape_timeout,
            max_sequence_len,
        }
    }

    /// Decode one key from `src`.
    ///
    /// Returns `Ok(None)` when no byte arrives within `idle_timeout`.
    ///
    /// # Errors
    ///
    /// Propagates the source's read error.
    pub fn read_key(&self, src: &mut impl ByteSource) -> Result<Option<KeyEvent>> {
        let escape = Some(KeyEvent::plain(KeyCode::Escape));
        let mut state = State::Idle;

        loop {
            state = match state {
                State::Idle => match src.read_byte(self.idle_timeout)? {
                    None => return Ok(None),
                    Some(ESC) => State::SawEscape,
                    Some(b) => return Ok(Some(KeyEvent::plain(KeyCode::Byte(b)))),
                },

                State::SawEscape => match src.read_byte(self.escape_timeout)? {
                    None => return Ok(escape),
                    Some(b'[') => State::Csi(Vec::with_capacity(8)),
                    Some(b'O') => State::Ss3,
                    Some(ESC) => {
                        return Ok(Some(KeyEvent::with(KeyCode::Escape, Modifiers::ALT)));
                    }
                    Some(b) => {
                        return Ok(Some(KeyEvent::with(KeyCode::Byte(b), Modifiers::ALT)));
                    }
                },

                State::Csi(mut params) => match src.read_byte(self.escape_timeout)? {
                    // Parameter (0x30..=0x3F) and intermediate (0x20..=0x2F) bytes.
                    Some(b @ 0x20..=0x3F) => {
                        if params.len() >= self.max_sequence_len {
                            log::trace!("escape sequence exceeds {} bytes", self.max_sequence_len);
                            self.discard_sequence(src)?;
                            return Ok(escape);
                        }
                        params.push(b);
                        State::Csi(params)
                    }
                    Some(fin @ 0x40..=0x7E) => {
                        let key = dispatch_csi(&params, fin);
                        if key.is_none() {
                            log::trace!("unknown CSI sequence {:?} {:?}", params, fin as char);
                        }
                        return Ok(key.or(escape));
                    }
                    _ => return Ok(escape),
                },

                State::Ss3 => {
                    let key = src.read_byte(self.escape_timeout)?.and_then(dispatch_ss3);
                    return Ok(key.or(escape));
                }
            };
        }
    }
}

impl Decoder {
    /// Skip the rest of a CSI sequence: stop after its final byte, after any
    /// byte that cannot belong to it, on timeout, or after `MAX_DISCARD`
    /// bytes.
    fn discard_sequence(&self, src: &mut impl ByteSource) -> Result<()> {
        for _ in 0..MAX_DISCARD {
            match src.read_byte(self.escape_timeout)? {
                Some(0x20..=0x3F) => {}
                Some(_) | None => return Ok(()),
            }
        }
        Ok(())
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

fn dispatch_csi(raw: &[u8], fin: u8) -> Option<KeyEvent> {
    // Private or intermediate bytes: not a key we know.
    if !raw.iter().all(|b| b.is_ascii_digit() || *b == b';') {
        return None;
    }

    let params = parse_csi_params(raw);
    let modifiers = params.get(1).map_or(Modifiers::empty(), |p| decode_modifiers(*p));

    let code = match fin {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'~' => match params.first().copied().unwrap_or(0) {
            1 | 7 => KeyCode::Home,
            2 => KeyCode::Insert,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            _ => return None,
        },
        _ => return None,
    };

    Some(KeyEvent::with(code, modifiers))
}

const fn dispatch_ss3(b: u8) -> Option<KeyEvent> {
    let code = match b {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        _ => return None,
    };
    Some(KeyEvent::plain(code))
}

/// Semicolon-separated decimal parameters. Empty fields read as 0.
///
/// - `1;5` → `[1, 5]`
/// - (empty) → `[]`
pub(crate) fn parse_csi_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|b| *b == b';')
        .map(|field| {
            field.iter().fold(0u16, |acc, d| {
                acc.saturating_mul(10)
                    .saturating_add(u16::from(d.wrapping_sub(b'0')))
            })
        })
        .collect()
}

/// `1 + bitmask`; 0 and 1 both mean no modifiers.
#[allow(clippy::cast_possible_truncation)] // Only the low bits carry flags.
const fn decode_modifiers(param: u16) -> Modifiers {
    let val = if param > 0 { param - 1 } else { 0 };
    Modifiers::from_bits_truncate(val as u8)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
