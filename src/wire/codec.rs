//! Sentinel codec for the remote-host command stream.
//!
//! Inbound bytes accumulate until one of the two control bytes arrives:
//! `0x00` yields the accumulated payload as a complete response message,
//! `0x01` yields it as inline console output to be flushed immediately.
//! Every other byte is payload. There is no escaping — scripts and output
//! must not contain either control byte, and the encoder rejects scripts
//! that do rather than corrupt the stream.
//!
//! Sentinel detection runs on raw bytes. Both control values are below
//! `0x80` and therefore never occur inside a UTF-8 multi-byte sequence, so
//! byte-level splitting is correct for UTF-8 payloads. Payloads are
//! converted to `String` lossily at the message boundary; a non-UTF-8
//! response then fails at the structured-parse step, which is already fatal
//! to that call.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{AppError, Result};

/// Control byte terminating one response message.
pub const RESPONSE_TERMINATOR: u8 = 0x00;

/// Control byte marking an inline-output flush point.
pub const INLINE_OUTPUT_MARKER: u8 = 0x01;

/// Maximum bytes accumulated without a control byte: 8 MiB.
///
/// A stream that exceeds this without terminating a message is treated as
/// corrupt; [`WireCodec::decode`] returns [`AppError::Protocol`] and the
/// reader loop converts it into stream closure for the pending call.
pub const MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;

/// One decoded event from the inbound stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// A complete response message (everything up to a `0x00`).
    Response(String),
    /// Console text to flush to the caller's output sink (up to a `0x01`).
    Inline(String),
}

/// Sentinel codec for bidirectional remote-host streams.
///
/// # Decoder
///
/// Splits the inbound stream on the two control bytes, emitting one
/// [`WireEvent`] per sentinel. Data after the last sentinel is buffered
/// until its control byte arrives; a buffer exceeding [`MAX_MESSAGE_BYTES`]
/// returns [`AppError::Protocol`].
///
/// # Encoder
///
/// Frames an outgoing script as its raw bytes followed by a single
/// `0x00` terminator. Scripts containing either control byte are rejected
/// with [`AppError::Protocol`].
#[derive(Debug, Default)]
pub struct WireCodec {
    /// Index into the buffer up to which no sentinel was found, so repeated
    /// `decode` calls do not rescan already-checked bytes.
    next_index: usize,
}

impl WireCodec {
    /// Create a new codec with an empty accumulation state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_control(byte: u8) -> bool {
    byte == RESPONSE_TERMINATOR || byte == INLINE_OUTPUT_MARKER
}

impl Decoder for WireCodec {
    type Item = WireEvent;
    type Error = AppError;

    /// Decode the next sentinel-delimited event from `src`.
    ///
    /// Returns `Ok(None)` while no control byte has arrived yet (buffering).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] when the unterminated buffer exceeds
    /// [`MAX_MESSAGE_BYTES`].
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<WireEvent>> {
        let unscanned = src.get(self.next_index..).unwrap_or_default();
        if let Some(offset) = unscanned.iter().position(|b| is_control(*b)) {
            let pos = self.next_index + offset;
            let mut payload_bytes = src.split_to(pos + 1);
            let sentinel = payload_bytes.split_off(pos);
            self.next_index = 0;

            let payload = String::from_utf8_lossy(&payload_bytes).into_owned();
            let event = if sentinel.first() == Some(&RESPONSE_TERMINATOR) {
                WireEvent::Response(payload)
            } else {
                WireEvent::Inline(payload)
            };
            return Ok(Some(event));
        }

        self.next_index = src.len();
        if src.len() > MAX_MESSAGE_BYTES {
            return Err(AppError::Protocol(format!(
                "message too long: exceeded {MAX_MESSAGE_BYTES} bytes without a terminator"
            )));
        }
        Ok(None)
    }

    /// Discard any partial payload left when the stream reaches EOF.
    ///
    /// The protocol delivers end-of-stream to the pending call as a closed
    /// marker; unterminated trailing bytes carry no complete event.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<WireEvent>> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }
        if !src.is_empty() {
            tracing::debug!(
                bytes = src.len(),
                "discarding unterminated payload at end of stream"
            );
            src.clear();
            self.next_index = 0;
        }
        Ok(None)
    }
}

impl Encoder<&str> for WireCodec {
    type Error = AppError;

    /// Frame `script` as raw bytes plus one `0x00` terminator into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] when the script contains one of the
    /// reserved control bytes — there is no escaping on this wire.
    fn encode(&mut self, script: &str, dst: &mut BytesMut) -> Result<()> {
        if script.bytes().any(is_control) {
            return Err(AppError::Protocol(
                "script contains a reserved control byte (0x00 or 0x01)".into(),
            ));
        }

        dst.reserve(script.len() + 1);
        dst.put_slice(script.as_bytes());
        dst.put_u8(RESPONSE_TERMINATOR);
        Ok(())
    }
}
