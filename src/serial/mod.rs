//! Serial transport: framing inbound messages and writing replies.
//!
//! The transport is either `Idle` (reading) or `Busy` (a reply is being
//! produced). Input that arrives while busy is drained and dropped, never
//! queued. The busy state is held through a [`BusyGuard`], so it is released
//! on every exit path, including cancellation of the task holding it.

pub mod decode;
pub mod port;

use std::io::{self, ErrorKind, Read, Write};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::config::SerialConfig;
use crate::error::TransportError;
use decode::{decode_frame, frame_reply, to_hex};

/// Byte link the transport drives. Implemented for real serial ports and
/// for in-memory links in tests.
pub trait SerialLink: Read + Write + Send {
    /// Number of bytes that can be read without waiting.
    fn pending(&mut self) -> io::Result<usize>;

    /// Drop everything in the input buffer.
    fn discard_input(&mut self) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Busy,
}

/// One framed message from the terminal.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub raw_bytes: Vec<u8>,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct FramingOptions {
    /// How long a started line may wait for its terminator.
    pub read_timeout: Duration,
    /// Pause after a line read before draining trailing bytes.
    pub settle: Duration,
    /// Upper bound on a single line read.
    pub max_line_bytes: usize,
}

impl From<&SerialConfig> for FramingOptions {
    fn from(config: &SerialConfig) -> Self {
        Self {
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            settle: Duration::from_millis(config.settle_ms),
            max_line_bytes: config.max_line_bytes.max(1),
        }
    }
}

/// Poll interval while a line is waiting for more bytes.
const LINE_POLL: Duration = Duration::from_millis(5);

pub struct SerialTransport<L: SerialLink> {
    link: L,
    state: LinkState,
    options: FramingOptions,
}

impl<L: SerialLink> SerialTransport<L> {
    pub fn new(link: L, options: FramingOptions) -> Self {
        Self {
            link,
            state: LinkState::Idle,
            options,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == LinkState::Busy
    }

    /// Enter `Busy` until the returned guard is dropped.
    pub fn begin_busy(&mut self) -> BusyGuard<'_, L> {
        self.state = LinkState::Busy;
        BusyGuard { transport: self }
    }

    /// Read one framed message, if any.
    ///
    /// Returns `None` when nothing is waiting, while busy, or when the read
    /// fails (the failure is logged). The link is only read while it reports
    /// pending bytes, so waiting for the rest of a line never blocks the
    /// runtime and the future can be dropped at any await point.
    pub async fn read_message(&mut self) -> Option<InboundMessage> {
        match self.try_read_message().await {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "error reading serial");
                None
            }
        }
    }

    async fn try_read_message(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        if self.is_busy() {
            let discarded = self.drain().map_err(TransportError::Read)?;
            if !discarded.is_empty() {
                tracing::info!(
                    bytes = discarded.len(),
                    hex = %to_hex(&discarded),
                    "ignored input while processing"
                );
            }
            return Ok(None);
        }

        let waiting = self.link.pending().map_err(TransportError::Read)?;
        if waiting == 0 {
            return Ok(None);
        }
        tracing::debug!(waiting, "bytes waiting");

        let line = self.read_line().await.map_err(TransportError::Read)?;
        if !self.options.settle.is_zero() {
            tokio::time::sleep(self.options.settle).await;
        }
        let trailing = self.drain().map_err(TransportError::Read)?;

        tracing::debug!(
            line = %String::from_utf8_lossy(&line),
            line_hex = %to_hex(&line),
            trailing_hex = %to_hex(&trailing),
            "raw frame"
        );

        // The line read wins whenever it produced anything; trailing bytes
        // are only used when the peer sent no terminator-delimited data.
        let raw = if !line.is_empty() { line } else { trailing };
        if raw.is_empty() {
            return Ok(None);
        }

        let text = decode_frame(&raw);
        tracing::info!(message = %text, bytes = raw.len(), "received message");
        Ok(Some(InboundMessage {
            raw_bytes: raw,
            text,
            received_at: Utc::now(),
        }))
    }

    /// Write one reply line and flush. Failures are logged, never returned.
    pub fn send(&mut self, reply: &str) {
        let frame = frame_reply(reply);
        let result = self
            .link
            .write_all(&frame)
            .and_then(|_| self.link.flush())
            .map_err(TransportError::Write);
        match result {
            Ok(()) => tracing::info!(bytes = frame.len(), reply = %reply.trim(), "response sent"),
            Err(e) => tracing::error!(error = %e, "error sending response"),
        }
    }

    /// Close the link.
    pub fn close(self) {
        drop(self.link);
        tracing::info!("serial port closed");
    }

    /// Read up to and including `\n`, stopping early when the read timeout
    /// passes with nothing more pending, at end of input, or at the line
    /// length bound.
    async fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let deadline = Instant::now() + self.options.read_timeout;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        while line.len() < self.options.max_line_bytes {
            if self.link.pending()? == 0 {
                if Instant::now() >= deadline {
                    break;
                }
                tokio::time::sleep(LINE_POLL).await;
                continue;
            }
            match self.link.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(line)
    }

    /// Read whatever is pending right now.
    fn drain(&mut self) -> io::Result<Vec<u8>> {
        let waiting = self.link.pending()?;
        if waiting == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; waiting];
        let mut filled = 0;
        while filled < waiting {
            match self.link.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

/// Holds the transport in `Busy`. Dropping it discards anything that
/// arrived in the meantime and returns the transport to `Idle`.
pub struct BusyGuard<'a, L: SerialLink> {
    transport: &'a mut SerialTransport<L>,
}

impl<L: SerialLink> Deref for BusyGuard<'_, L> {
    type Target = SerialTransport<L>;

    fn deref(&self) -> &Self::Target {
        self.transport
    }
}

impl<L: SerialLink> DerefMut for BusyGuard<'_, L> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.transport
    }
}

impl<L: SerialLink> Drop for BusyGuard<'_, L> {
    fn drop(&mut self) {
        match self.transport.drain() {
            Ok(discarded) if !discarded.is_empty() => tracing::info!(
                bytes = discarded.len(),
                hex = %to_hex(&discarded),
                "ignored input received while processing"
            ),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to drain input while busy"),
        }
        if let Err(e) = self.transport.link.discard_input() {
            tracing::debug!(error = %e, "failed to clear input buffer");
        }
        self.transport.state = LinkState::Idle;
    }
}
