// SPDX-License-Identifier: MIT
//
// lite-term demo — a key viewer.
//
// Opens a session, draws a title bar, a column of `~` markers and a log of
// decoded keys, and repaints after every key or resize. `q` or Ctrl-Q quits.
//
// Usage:
//   cargo run -p lite-term --example demo

use std::collections::VecDeque;

use lite_term::{
    Attrs, CellBuffer, Color, KeyCode, KeyEvent, Modifiers, Result, Session, SessionConfig, Style,
};

/// Most keys kept in the log.
const MAX_LOG_ENTRIES: usize = 200;

const BODY_BG: Color = Color::hex(0x1a_1b_26);

const TITLE: Style = Style::new(Color::hex(0x1a_1b_26), Color::hex(0x7a_a2_f7)).with_attrs(Attrs::BOLD);
const BODY: Style = Style::new(Color::hex(0xc0_ca_f5), BODY_BG);
const TILDE: Style = Style::new(Color::hex(0x3b_42_61), BODY_BG);
const KEY: Style = Style::new(Color::hex(0x9e_ce_6a), BODY_BG);
const STATUS: Style = Style::new(Color::hex(0xc0_ca_f5), Color::hex(0x24_28_3b));

struct Viewer {
    log: VecDeque<String>,
    keys: u64,
}

impl Viewer {
    fn new() -> Self {
        Self {
            log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            keys: 0,
        }
    }

    fn push(&mut self, key: KeyEvent) {
        self.keys += 1;
        if self.log.len() >= MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
        self.log.push_back(describe(key));
    }

    /// Every cell gets a concrete background, so nothing depends on the
    /// color the previous cell left active.
    fn paint(&self, buf: &mut CellBuffer) -> Result<()> {
        let (w, h) = (buf.width(), buf.height());
        buf.fill(BODY);

        for x in 0..w {
            buf.put_str(x, 0, " ", TITLE)?;
        }
        buf.put_str(1, 0, "lite-term key viewer", TITLE)?;
        let hint = "q to quit";
        #[allow(clippy::cast_possible_truncation)] // hint is 9 columns.
        let hint_x = w.saturating_sub(hint.len() as u16 + 1);
        buf.put_str(hint_x, 0, hint, TITLE)?;

        let body = h.saturating_sub(2);
        let skip = self.log.len().saturating_sub(usize::from(body));
        for row in 0..body {
            let y = row + 1;
            match self.log.iter().nth(skip + usize::from(row)) {
                Some(entry) => buf.put_str(0, y, entry, KEY)?,
                None => buf.put_str(0, y, "~", TILDE)?,
            };
        }

        if h >= 2 {
            let status_y = h - 1;
            for x in 0..w {
                buf.put_str(x, status_y, " ", STATUS)?;
            }
            let status = format!(" {w}x{h} | {} keys", self.keys);
            buf.put_str(0, status_y, &status, STATUS)?;
        }
        Ok(())
    }
}

fn describe(key: KeyEvent) -> String {
    let mut parts = Vec::new();
    if key.modifiers.contains(Modifiers::CTRL) {
        parts.push("Ctrl".to_owned());
    }
    if key.modifiers.contains(Modifiers::ALT) {
        parts.push("Alt".to_owned());
    }
    if key.modifiers.contains(Modifiers::SHIFT) {
        parts.push("Shift".to_owned());
    }
    parts.push(match key.code {
        KeyCode::Byte(b) if b.is_ascii_graphic() => format!("'{}' ({b})", char::from(b)),
        KeyCode::Byte(b) if b < 0x20 => format!("^{} ({b})", char::from(b | 0x40)),
        KeyCode::Byte(b) => format!("byte {b}"),
        other => format!("{other:?}"),
    });
    parts.join("+")
}

fn main() -> Result<()> {
    let mut session = Session::open(SessionConfig::default())?;
    let mut viewer = Viewer::new();

    loop {
        viewer.paint(session.buffer_mut()?)?;
        session.refresh()?;

        if session.termination_requested() {
            break;
        }
        session.poll_resize()?;

        let Some(key) = session.read_key()? else {
            continue;
        };
        if key.code == KeyCode::Byte(b'q') || key.is_ctrl(b'q') {
            break;
        }
        viewer.push(key);
    }

    session.exit()
}
