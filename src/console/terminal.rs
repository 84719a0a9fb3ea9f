use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use crossterm::event::{
    Event as CrosstermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use futures::StreamExt;
use tracing::debug;

use crate::console::transport::ByteSource;
use crate::error::{ApScanError, ApScanResult};

const BACKSPACE: u8 = 0x08;
const ESCAPE: u8 = 0x1b;
const DELETE: u8 = 0x7f;

/// Puts the controlling terminal into raw mode for as long as it lives,
/// so keystrokes arrive one at a time and the console does its own echo.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Console input from the local terminal.
///
/// Uses crossterm's async `EventStream` instead of a blocking stdin read, so
/// no runtime thread is parked on the terminal and shutdown never waits for
/// a keypress. Key presses are turned back into the bytes a serial line
/// would carry; Ctrl-C and Ctrl-D end the session.
pub struct TerminalSource {
    events: EventStream,
    pending: VecDeque<u8>,
}

impl TerminalSource {
    pub fn new() -> Self {
        Self {
            events: EventStream::new(),
            pending: VecDeque::new(),
        }
    }
}

impl Default for TerminalSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteSource for TerminalSource {
    async fn read_byte(&mut self, timeout: Duration) -> ApScanResult<Option<u8>> {
        if let Some(byte) = self.pending.pop_front() {
            return Ok(Some(byte));
        }

        match tokio::time::timeout(timeout, self.events.next()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(ApScanError::Closed),
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(Some(Ok(CrosstermEvent::Key(key)))) if key.kind == KeyEventKind::Press => {
                if !encode_key(&key, &mut self.pending) {
                    debug!("Terminal session closed by {:?}", key.code);
                    return Err(ApScanError::Closed);
                }
                Ok(self.pending.pop_front())
            }
            Ok(Some(Ok(_))) => Ok(None),
        }
    }
}

/// Append the bytes a key press stands for.
///
/// Returns `false` for the keys that close the session.
pub fn encode_key(key: &KeyEvent, out: &mut VecDeque<u8>) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c' | 'd') if ctrl => return false,
        KeyCode::Char(c) if ctrl && c.is_ascii_alphabetic() => {
            // Ctrl-A..Ctrl-Z map onto 0x01..0x1a
            out.push_back(c.to_ascii_lowercase() as u8 - b'a' + 1);
        }
        KeyCode::Char(c) => {
            let mut utf8 = [0u8; 4];
            out.extend(c.encode_utf8(&mut utf8).bytes());
        }
        KeyCode::Enter => out.push_back(b'\r'),
        KeyCode::Tab => out.push_back(b'\t'),
        KeyCode::Backspace => out.push_back(BACKSPACE),
        KeyCode::Delete => out.push_back(DELETE),
        KeyCode::Esc => out.push_back(ESCAPE),
        _ => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(code: KeyCode, modifiers: KeyModifiers) -> (bool, Vec<u8>) {
        let mut out = VecDeque::new();
        let open = encode_key(&KeyEvent::new(code, modifiers), &mut out);
        (open, out.into_iter().collect())
    }

    #[test]
    fn printable_keys_become_ascii() {
        assert_eq!(encode(KeyCode::Char('s'), KeyModifiers::NONE), (true, vec![b's']));
        assert_eq!(encode(KeyCode::Char('A'), KeyModifiers::SHIFT), (true, vec![b'A']));
        assert_eq!(encode(KeyCode::Char(' '), KeyModifiers::NONE), (true, vec![b' ']));
    }

    #[test]
    fn enter_is_carriage_return() {
        assert_eq!(encode(KeyCode::Enter, KeyModifiers::NONE), (true, vec![b'\r']));
    }

    #[test]
    fn control_keys_become_control_bytes() {
        assert_eq!(encode(KeyCode::Char('a'), KeyModifiers::CONTROL), (true, vec![0x01]));
        assert_eq!(encode(KeyCode::Esc, KeyModifiers::NONE), (true, vec![ESCAPE]));
    }

    #[test]
    fn non_ascii_expands_to_utf8() {
        assert_eq!(
            encode(KeyCode::Char('é'), KeyModifiers::NONE),
            (true, vec![0xc3, 0xa9])
        );
    }

    #[test]
    fn ctrl_c_and_ctrl_d_close() {
        assert!(!encode(KeyCode::Char('c'), KeyModifiers::CONTROL).0);
        assert!(!encode(KeyCode::Char('d'), KeyModifiers::CONTROL).0);
    }

    #[test]
    fn navigation_keys_are_ignored() {
        assert_eq!(encode(KeyCode::Up, KeyModifiers::NONE), (true, vec![]));
    }
}
