//! Line-oriented command console.
//!
//! Bytes arrive one at a time from a [`ByteSource`]. Printable ASCII is
//! buffered and echoed, CR or LF ends the line, and the sanitized line is
//! dispatched to the [`ScanController`].

pub mod serial;
pub mod terminal;
pub mod transport;

use std::time::Duration;

use tracing::debug;

use crate::error::{ApScanError, ApScanResult};
use crate::scanner::{ScanController, StartOutcome};
use transport::{ByteSource, ConsoleWriter};

/// Size of the line and command buffers; one slot stays reserved, as for a
/// C string, so at most `LINE_CAPACITY - 1` bytes are kept
pub const LINE_CAPACITY: usize = 128;

/// Sanitized commands shorter than this are ignored without a reply
pub const MIN_COMMAND_LEN: usize = 3;

/// How long one tick waits for input before yielding
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

pub const PROMPT: &str = "> ";
pub const BANNER: &str = "\nAP scanner CLI ready. Type 'help'.\n";

pub const HELP_TEXT: &str = "Available commands:\n\
                             \x20 scanap   - Continuous AP scan\n\
                             \x20 stopscan - Stop AP scan\n\
                             \x20 help     - Show this help\n";

// ── Line handling ─────────────────────────────────────────────────────

/// Bytes typed since the last line terminator
#[derive(Debug, Default)]
pub struct LineBuffer {
    bytes: heapless::Vec<u8, LINE_CAPACITY>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a byte if there is room; a full buffer refuses it
    pub fn push(&mut self, byte: u8) -> bool {
        if self.bytes.len() >= LINE_CAPACITY - 1 {
            return false;
        }
        self.bytes.push(byte).is_ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

/// Keep ASCII letters, digits, `_`, `-` and `.`; drop everything else.
///
/// Stops at a NUL and keeps at most `N - 1` characters, so overlong input is
/// truncated rather than rejected.
pub fn sanitize<const N: usize>(raw: &[u8]) -> heapless::String<N> {
    let mut command = heapless::String::new();
    let allowed = raw
        .iter()
        .take_while(|&&b| b != 0)
        .filter(|&&b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));

    for &byte in allowed {
        if command.len() >= N.saturating_sub(1) {
            break;
        }
        // Only ASCII gets here, so every byte is a whole char
        let _ = command.push(char::from(byte));
    }
    command
}

// ── Commands ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ScanAp,
    StopScan,
    Help,
    Unknown(String),
}

impl Command {
    /// Map a sanitized line to a command; short lines are not commands
    pub fn parse(sanitized: &str) -> Option<Self> {
        if sanitized.len() < MIN_COMMAND_LEN {
            return None;
        }
        Some(match sanitized {
            "scanap" => Self::ScanAp,
            "stopscan" => Self::StopScan,
            "help" => Self::Help,
            other => Self::Unknown(other.to_string()),
        })
    }
}

// ── Interpreter ───────────────────────────────────────────────────────

/// Reads the console, echoes input and runs commands against the scanner
pub struct CommandInterpreter<S> {
    source: S,
    console: ConsoleWriter,
    controller: ScanController,
    line: LineBuffer,
    read_timeout: Duration,
}

impl<S: ByteSource> CommandInterpreter<S> {
    pub fn new(
        source: S,
        console: ConsoleWriter,
        controller: ScanController,
        read_timeout: Duration,
    ) -> Self {
        Self {
            source,
            console,
            controller,
            line: LineBuffer::new(),
            read_timeout,
        }
    }

    pub fn controller(&self) -> &ScanController {
        &self.controller
    }

    /// Print the banner and the first prompt
    pub fn greet(&self) {
        self.console.write(format!("{BANNER}{PROMPT}"));
    }

    /// Wait up to the read timeout for one byte and handle it.
    ///
    /// Returns `Ok(())` on timeout too, so the caller's loop keeps yielding.
    pub async fn tick(&mut self) -> ApScanResult<()> {
        if let Some(byte) = self.source.read_byte(self.read_timeout).await? {
            self.handle_byte(byte);
        }
        Ok(())
    }

    pub fn handle_byte(&mut self, byte: u8) {
        match byte {
            b'\r' | b'\n' => {
                let command = sanitize::<LINE_CAPACITY>(self.line.as_bytes());
                self.line.clear();
                if let Some(command) = Command::parse(&command) {
                    self.dispatch(command);
                }
                self.console.write(PROMPT);
            }
            32..=126 => {
                if self.line.push(byte) {
                    self.console.write(char::from(byte).to_string());
                }
            }
            _ => {}
        }
    }

    pub fn dispatch(&self, command: Command) {
        debug!("Console command: {:?}", command);
        match command {
            Command::ScanAp => match self.controller.start() {
                StartOutcome::Started => self.console.line("Continuous scan started (scanap)."),
                // A loop that is still finishing after a stop counts as running
                StartOutcome::AlreadyRunning | StartOutcome::Stopping => {
                    self.console.line("Scan already running.")
                }
            },
            Command::StopScan => {
                self.controller.stop();
                self.console.line("Scan stopped.");
            }
            Command::Help => self.console.write(HELP_TEXT),
            Command::Unknown(text) => self.console.line(format!(
                "Unknown command: '{text}'. Type 'help' for list of commands."
            )),
        }
    }

    /// Serve the console until the input side closes, then stop scanning.
    pub async fn run(mut self) -> ApScanResult<()> {
        self.greet();

        let result = loop {
            match self.tick().await {
                Ok(()) => {}
                Err(ApScanError::Closed) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.controller.shutdown().await;
        debug!("Console session ended");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApScanResult;
    use crate::network::radio::Radio;
    use crate::network::snapshot::SnapshotStore;
    use crate::network::types::RawAccessPoint;
    use crate::scanner::ScanState;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct EmptyRadio;

    #[async_trait]
    impl Radio for EmptyRadio {
        async fn scan(&self) -> ApScanResult<Vec<RawAccessPoint>> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    /// Radio whose scans take five seconds
    struct SlowRadio;

    #[async_trait]
    impl Radio for SlowRadio {
        async fn scan(&self) -> ApScanResult<Vec<RawAccessPoint>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    /// Source that never yields input
    struct Silent;

    #[async_trait]
    impl ByteSource for Silent {
        async fn read_byte(&mut self, timeout: Duration) -> ApScanResult<Option<u8>> {
            tokio::time::sleep(timeout).await;
            Ok(None)
        }
    }

    fn interpreter() -> (CommandInterpreter<Silent>, mpsc::UnboundedReceiver<String>) {
        let (console, rx) = ConsoleWriter::channel();
        let controller = ScanController::new(
            Arc::new(EmptyRadio),
            Arc::new(SnapshotStore::new()),
            console.clone(),
            Duration::from_millis(1700),
        );
        (
            CommandInterpreter::new(Silent, console, controller, DEFAULT_READ_TIMEOUT),
            rx,
        )
    }

    fn feed(interp: &mut CommandInterpreter<Silent>, input: &[u8]) {
        for &byte in input {
            interp.handle_byte(byte);
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        let mut out = String::new();
        while let Ok(text) = rx.try_recv() {
            out.push_str(&text);
        }
        out
    }

    #[test]
    fn sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize::<LINE_CAPACITY>(b"sc!an ap\t").as_str(), "scanap");
        assert_eq!(sanitize::<LINE_CAPACITY>(b"v1.2_beta-x").as_str(), "v1.2_beta-x");
        assert_eq!(sanitize::<LINE_CAPACITY>(b"!@# $%\x01\x7f").as_str(), "");
    }

    #[test]
    fn sanitize_stops_at_nul() {
        assert_eq!(sanitize::<LINE_CAPACITY>(b"help\0scanap").as_str(), "help");
    }

    #[test]
    fn sanitize_truncates_to_capacity_minus_one() {
        assert_eq!(sanitize::<8>(b"abcdefghijkl").as_str(), "abcdefg");
    }

    #[test]
    fn short_and_empty_lines_are_not_commands() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("ab"), None);
        assert_eq!(Command::parse("abc"), Some(Command::Unknown("abc".into())));
        assert_eq!(Command::parse("SCANAP"), Some(Command::Unknown("SCANAP".into())));
        assert_eq!(Command::parse("scanap"), Some(Command::ScanAp));
    }

    #[test]
    fn line_buffer_reserves_terminator_slot() {
        let mut line = LineBuffer::new();
        for _ in 0..LINE_CAPACITY - 1 {
            assert!(line.push(b'a'));
        }
        assert!(!line.push(b'a'));
        assert_eq!(line.len(), LINE_CAPACITY - 1);
    }

    #[tokio::test]
    async fn echoes_printable_input_only() {
        let (mut interp, mut rx) = interpreter();

        feed(&mut interp, b"he\x07l\x1bp");
        assert_eq!(drain(&mut rx), "help");
        assert_eq!(interp.line.as_bytes(), b"help");
    }

    #[tokio::test]
    async fn help_lists_three_commands() {
        let (mut interp, mut rx) = interpreter();

        feed(&mut interp, b"help\r");
        let out = drain(&mut rx);
        assert_eq!(out, format!("help{HELP_TEXT}{PROMPT}"));
        assert_eq!(HELP_TEXT.lines().count(), 4);
        assert_eq!(interp.controller().state(), ScanState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn help_is_unchanged_while_scanning() {
        let (mut interp, mut rx) = interpreter();

        feed(&mut interp, b"scanap\r");
        drain(&mut rx);
        assert_eq!(interp.controller().state(), ScanState::Scanning);

        feed(&mut interp, b"help\r");
        assert_eq!(drain(&mut rx), format!("help{HELP_TEXT}{PROMPT}"));
        assert_eq!(interp.controller().state(), ScanState::Scanning);

        interp.controller().shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scanap_while_stop_is_pending_reports_already_running() {
        let (console, mut rx) = ConsoleWriter::channel();
        let controller = ScanController::new(
            Arc::new(SlowRadio),
            Arc::new(SnapshotStore::new()),
            console.clone(),
            Duration::from_millis(1700),
        );
        let mut interp = CommandInterpreter::new(Silent, console, controller, DEFAULT_READ_TIMEOUT);

        feed(&mut interp, b"scanap\r");
        tokio::time::sleep(Duration::from_millis(100)).await;
        feed(&mut interp, b"stopscan\r");
        drain(&mut rx);

        // The first scan is still in flight, so the old loop has not exited
        feed(&mut interp, b"scanap\r");
        assert_eq!(interp.controller().state(), ScanState::Scanning);
        assert_eq!(drain(&mut rx), "scanapScan already running.\n> ");

        interp.controller().shutdown().await;
        assert_eq!(interp.controller().state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn blank_and_garbage_lines_only_reprompt() {
        let (mut interp, mut rx) = interpreter();

        feed(&mut interp, b"\r");
        feed(&mut interp, b"!!\n");
        feed(&mut interp, b"a b\r");
        assert_eq!(drain(&mut rx), "> !!> a b> ");
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let (mut interp, mut rx) = interpreter();

        feed(&mut interp, b"scan ap!\r");
        // Sanitized to a known command
        assert!(drain(&mut rx).contains("Continuous scan started (scanap)."));

        feed(&mut interp, b"reboot now\r");
        assert!(drain(&mut rx).contains(
            "Unknown command: 'rebootnow'. Type 'help' for list of commands.\n"
        ));

        interp.controller().shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scanap_twice_then_stopscan() {
        let (mut interp, mut rx) = interpreter();

        feed(&mut interp, b"scanap\r");
        assert_eq!(interp.controller().state(), ScanState::Scanning);
        assert!(drain(&mut rx).ends_with("Continuous scan started (scanap).\n> "));

        tokio::time::sleep(Duration::from_millis(200)).await;
        feed(&mut interp, b"scanap\n");
        assert!(drain(&mut rx).ends_with("Scan already running.\n> "));

        feed(&mut interp, b"stopscan\r");
        assert!(drain(&mut rx).ends_with("Scan stopped.\n> "));

        interp.controller().shutdown().await;
        assert_eq!(interp.controller().state(), ScanState::Idle);

        // Reported unconditionally, even when idle
        feed(&mut interp, b"stopscan\r");
        assert!(drain(&mut rx).ends_with("Scan stopped.\n> "));
    }

    #[tokio::test]
    async fn overlong_line_is_truncated_not_echoed() {
        let (mut interp, mut rx) = interpreter();

        let long = vec![b'x'; LINE_CAPACITY + 20];
        feed(&mut interp, &long);
        assert_eq!(drain(&mut rx).len(), LINE_CAPACITY - 1);

        feed(&mut interp, b"\r");
        let out = drain(&mut rx);
        assert!(out.starts_with("Unknown command: '"));
        assert!(out.contains(&"x".repeat(LINE_CAPACITY - 1)));
    }

    proptest! {
        #[test]
        fn sanitized_output_is_always_clean(raw in proptest::collection::vec(any::<u8>(), 0..300)) {
            let command = sanitize::<LINE_CAPACITY>(&raw);
            prop_assert!(command.len() < LINE_CAPACITY);
            prop_assert!(command
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')));
        }
    }
}
