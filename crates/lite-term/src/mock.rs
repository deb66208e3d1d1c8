// SPDX-License-Identifier: MIT
//
// Test doubles: a scripted byte source, an in-memory terminal device, and a
// tiny terminal-state simulator that replays an escape stream into a grid.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use unicode_width::UnicodeWidthChar;

use crate::cell::Attrs;
use crate::error::{Error, Result};
use crate::input::ByteSource;
use crate::terminal::{Device, Size};

// ─── ScriptedInput ───────────────────────────────────────────────────────────

/// Bytes handed out one per read; an empty script reads as a timeout.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: VecDeque<u8>,
    consumed: usize,
    timeouts: Vec<Duration>,
    fail_when_empty: bool,
}

impl ScriptedInput {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            script: bytes.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.script.extend(bytes.iter().copied());
    }

    /// Once the script runs dry, reads fail instead of timing out.
    pub fn fail_after_script(&mut self) {
        self.fail_when_empty = true;
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// Timeout passed to every read so far.
    pub fn timeouts(&self) -> &[Duration] {
        &self.timeouts
    }
}

impl ByteSource for ScriptedInput {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        self.timeouts.push(timeout);
        match self.script.pop_front() {
            Some(b) => {
                self.consumed += 1;
                Ok(Some(b))
            }
            None if self.fail_when_empty => Err(Error::device(
                "read",
                io::Error::other("scripted read failure"),
            )),
            None => Ok(None),
        }
    }
}

// ─── MockDevice ──────────────────────────────────────────────────────────────

/// Line-discipline state of the mock terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockMode {
    pub raw: bool,
    pub read_timeout: Duration,
}

impl MockMode {
    pub const COOKED: Self = Self {
        raw: false,
        read_timeout: Duration::ZERO,
    };
}

/// In-memory terminal with failure injection.
#[derive(Debug)]
pub struct MockDevice {
    pub mode: MockMode,
    pub size: Size,
    pub input: ScriptedInput,
    /// Every successful write call, in order.
    pub writes: Vec<Vec<u8>>,
    pub guarded: bool,
    pub fail_get_mode: bool,
    pub fail_set_mode: bool,
    pub fail_size: bool,
    /// Number of upcoming writes that fail outright.
    pub failing_writes: usize,
    /// The next write accepts only this many bytes.
    pub short_write: Option<usize>,
}

impl MockDevice {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            mode: MockMode::COOKED,
            size: Size { cols, rows },
            input: ScriptedInput::default(),
            writes: Vec::new(),
            guarded: false,
            fail_get_mode: false,
            fail_set_mode: false,
            fail_size: false,
            failing_writes: 0,
            short_write: None,
        }
    }

    /// All bytes written so far, concatenated.
    pub fn output(&self) -> Vec<u8> {
        self.writes.concat()
    }

    pub fn output_string(&self) -> String {
        String::from_utf8(self.output()).unwrap()
    }
}

impl ByteSource for MockDevice {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        self.input.read_byte(timeout)
    }
}

impl Device for MockDevice {
    type Mode = MockMode;

    fn get_mode(&mut self) -> io::Result<MockMode> {
        if self.fail_get_mode {
            return Err(io::Error::other("tcgetattr refused"));
        }
        Ok(self.mode)
    }

    fn set_mode(&mut self, mode: &MockMode) -> io::Result<()> {
        if self.fail_set_mode {
            return Err(io::Error::other("tcsetattr refused"));
        }
        self.mode = *mode;
        Ok(())
    }

    fn raw_mode(&self, _original: &MockMode, read_timeout: Duration) -> MockMode {
        MockMode {
            raw: true,
            read_timeout,
        }
    }

    fn window_size(&mut self) -> io::Result<Size> {
        if self.fail_size {
            return Err(io::Error::other("TIOCGWINSZ refused"));
        }
        Ok(self.size)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let n = self.short_write.take().map_or(bytes.len(), |n| n.min(bytes.len()));
        self.writes.push(bytes[..n].to_vec());
        Ok(n)
    }

    fn guard_mode(&mut self, _original: &MockMode) {
        self.guarded = true;
    }

    fn release_guard(&mut self) {
        self.guarded = false;
    }
}

// ─── Screen simulator ────────────────────────────────────────────────────────

/// SGR state as a terminal would hold it. `None` colors are the terminal's
/// own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimStyle {
    pub fg: Option<(u8, u8, u8)>,
    pub bg: Option<(u8, u8, u8)>,
    pub attrs: Attrs,
}

/// Replays the subset of VT sequences the renderer emits.
#[derive(Debug)]
pub struct Screen {
    pub width: u16,
    pub height: u16,
    cells: Vec<(char, SimStyle)>,
    /// `(col, row)`; `col == width` is the pending-wrap position.
    pub cursor: (u16, u16),
    saved: Option<(u16, u16)>,
    pub style: SimStyle,
    pub cursor_visible: bool,
    pub alt_screen: bool,
    /// Number of SGR sequences seen.
    pub sgr_groups: usize,
    /// Number of CUP sequences with explicit coordinates.
    pub cup_moves: usize,
}

impl Screen {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![('\0', SimStyle::default()); usize::from(width) * usize::from(height)],
            cursor: (0, 0),
            saved: None,
            style: SimStyle::default(),
            cursor_visible: true,
            alt_screen: false,
            sgr_groups: 0,
            cup_moves: 0,
        }
    }

    pub fn cell(&self, x: u16, y: u16) -> (char, SimStyle) {
        self.cells[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        let text = std::str::from_utf8(bytes).expect("frame is UTF-8");
        let mut chars = text.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\x1b' => {
                    assert_eq!(chars.next(), Some('['), "only CSI sequences expected");
                    let mut params = String::new();
                    let fin = loop {
                        let c = chars.next().expect("unterminated CSI");
                        if ('\x40'..='\x7e').contains(&c) {
                            break c;
                        }
                        params.push(c);
                    };
                    self.csi(&params, fin);
                }
                '\r' => self.cursor.0 = 0,
                '\n' => self.cursor.1 = (self.cursor.1 + 1).min(self.height - 1),
                c => self.print(c),
            }
        }
    }

    fn print(&mut self, c: char) {
        let w = c.width().unwrap_or(0);
        if w == 0 {
            return;
        }
        if self.cursor.0 >= self.width {
            self.cursor = (0, (self.cursor.1 + 1).min(self.height - 1));
        }
        let (x, y) = self.cursor;
        let i = usize::from(y) * usize::from(self.width) + usize::from(x);
        self.cells[i] = (c, self.style);
        if w == 2 && x + 1 < self.width {
            self.cells[i + 1] = ('\0', self.style);
        }
        #[allow(clippy::cast_possible_truncation)]
        let advance = w as u16;
        self.cursor.0 = (x + advance).min(self.width);
    }

    fn csi(&mut self, params: &str, fin: char) {
        match (params, fin) {
            ("", 'H') => self.cursor = (0, 0),
            (p, 'H') => {
                let (row, col) = p.split_once(';').expect("row;col");
                let row: u16 = row.parse().unwrap();
                let col: u16 = col.parse().unwrap();
                self.cursor = (col - 1, row - 1);
                self.cup_moves += 1;
            }
            ("", 's') => self.saved = Some(self.cursor),
            ("", 'u') => {
                if let Some(pos) = self.saved {
                    self.cursor = pos;
                }
            }
            ("?25", 'h') => self.cursor_visible = true,
            ("?25", 'l') => self.cursor_visible = false,
            ("?1049", 'h') => self.alt_screen = true,
            ("?1049", 'l') => self.alt_screen = false,
            (p, 'm') => {
                self.sgr_groups += 1;
                self.sgr(p);
            }
            (p, f) => panic!("unexpected sequence ESC [ {p} {f}"),
        }
    }

    fn sgr(&mut self, params: &str) {
        let mut nums = params
            .split(';')
            .map(|p| if p.is_empty() { 0 } else { p.parse::<u8>().unwrap() });
        while let Some(n) = nums.next() {
            match n {
                0 => self.style = SimStyle::default(),
                38 | 48 => {
                    assert_eq!(nums.next(), Some(2), "truecolor only");
                    let rgb = (
                        nums.next().unwrap(),
                        nums.next().unwrap(),
                        nums.next().unwrap(),
                    );
                    if n == 38 {
                        self.style.fg = Some(rgb);
                    } else {
                        self.style.bg = Some(rgb);
                    }
                }
                39 => self.style.fg = None,
                49 => self.style.bg = None,
                _ => {
                    let (flag, set) = match n {
                        1 => (Attrs::BOLD, true),
                        22 => (Attrs::BOLD, false),
                        3 => (Attrs::ITALIC, true),
                        23 => (Attrs::ITALIC, false),
                        4 => (Attrs::UNDERLINE, true),
                        24 => (Attrs::UNDERLINE, false),
                        5 => (Attrs::BLINK, true),
                        25 => (Attrs::BLINK, false),
                        7 => (Attrs::INVERSE, true),
                        27 => (Attrs::INVERSE, false),
                        9 => (Attrs::STRIKETHROUGH, true),
                        29 => (Attrs::STRIKETHROUGH, false),
                        other => panic!("unexpected SGR parameter {other}"),
                    };
                    self.style.attrs.set(flag, set);
                }
            }
        }
    }
}
