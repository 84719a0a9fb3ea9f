use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{ApScanError, ApScanResult};

// ── Input ─────────────────────────────────────────────────────────────

/// A console byte stream read one byte at a time.
///
/// `Ok(None)` means nothing arrived within `timeout`; a source that will
/// never produce input again returns [`ApScanError::Closed`].
#[async_trait]
pub trait ByteSource: Send {
    async fn read_byte(&mut self, timeout: Duration) -> ApScanResult<Option<u8>>;
}

/// Byte source over any async reader (serial port half, pipe, test duplex)
pub struct StreamSource<R> {
    reader: R,
}

impl<R> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> ByteSource for StreamSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_byte(&mut self, timeout: Duration) -> ApScanResult<Option<u8>> {
        let mut byte = [0u8; 1];
        // `read` is cancel safe, so a timeout never loses a byte
        match tokio::time::timeout(timeout, self.reader.read(&mut byte)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Err(ApScanError::Closed),
            Ok(Ok(_)) => Ok(Some(byte[0])),
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────

/// Shared handle for writing to the console.
///
/// The interpreter and the scan loop both hold one. Each call is delivered
/// to the writer task as a single message, so a rendered scan never gets
/// split by an echoed keystroke.
#[derive(Clone)]
pub struct ConsoleWriter {
    tx: mpsc::UnboundedSender<String>,
}

impl fmt::Debug for ConsoleWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleWriter")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl ConsoleWriter {
    /// Create a writer handle and the receiving end for a writer task
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Write text as-is
    pub fn write(&self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        // The writer only goes away during shutdown; output is moot then
        if self.tx.send(text).is_err() {
            debug!("Console writer closed, dropping output");
        }
    }

    /// Write text followed by a newline
    pub fn line(&self, text: impl fmt::Display) {
        self.write(format!("{text}\n"));
    }
}

/// Spawn the task that owns the console sink and drains queued output.
///
/// With `crlf` set, every `\n` goes out as `\r\n` (raw terminals and most
/// serial terminals need the carriage return). Ends once every
/// [`ConsoleWriter`] has been dropped.
pub fn spawn_writer<W>(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sink: W,
    crlf: bool,
) -> JoinHandle<ApScanResult<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            let text = if crlf {
                text.replace('\n', "\r\n")
            } else {
                text
            };
            sink.write_all(text.as_bytes()).await?;
            sink.flush().await?;
        }
        sink.shutdown().await?;
        Ok(())
    })
}
