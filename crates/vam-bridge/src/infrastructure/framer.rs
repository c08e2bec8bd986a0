//! Message framer: reads a connection's byte stream and yields messages.
//!
//! TCP is a stream protocol: one `read()` may return part of a message or
//! several messages at once.  [`MessageFramer`] owns a per-connection
//! accumulation buffer and a [`FrameDecoder`] chosen by the configured
//! [`FramingPolicy`], and turns the stream into a sequence of
//! [`NextMessage`] values.

use tokio::io::{AsyncRead, AsyncReadExt};
use vam_core::{decode_text, FrameDecoder, FramedMessage, FramingPolicy, MessageError};

/// One step of a connection's message stream.
#[derive(Debug)]
pub enum NextMessage {
    /// A decoded, trimmed text message.
    Message(FramedMessage),
    /// A frame that could not be decoded; the stream continues.
    Malformed(MessageError),
    /// The peer closed the connection and every buffered byte was consumed.
    EndOfStream,
}

/// Cuts an `AsyncRead` into [`NextMessage`]s.
pub struct MessageFramer<R> {
    reader: R,
    decoder: Box<dyn FrameDecoder>,
    /// Bytes received but not yet claimed by the decoder.
    buf: Vec<u8>,
    /// Scratch space for a single `read()` call.
    read_tmp: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> MessageFramer<R> {
    pub fn new(reader: R, policy: &FramingPolicy) -> Self {
        let decoder = policy.decoder();
        let read_tmp = vec![0u8; decoder.read_size()];
        Self {
            reader,
            decoder,
            buf: Vec::with_capacity(read_tmp.len()),
            read_tmp,
            eof: false,
        }
    }

    /// Returns the next message, reading from the stream as needed.
    ///
    /// After [`NextMessage::EndOfStream`] every further call returns
    /// `EndOfStream` again.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if a read fails (for example a
    /// connection reset).  The framer should not be used afterwards.
    pub async fn next_message(&mut self) -> std::io::Result<NextMessage> {
        loop {
            let step = if self.eof {
                self.decoder.decode_eof(&mut self.buf)
            } else {
                self.decoder.decode(&mut self.buf)
            };

            match step {
                Ok(Some(frame)) => {
                    return Ok(match decode_text(&frame) {
                        Ok(message) => NextMessage::Message(message),
                        Err(e) => NextMessage::Malformed(e),
                    });
                }
                Err(e) => return Ok(NextMessage::Malformed(e.into())),
                Ok(None) if self.eof => return Ok(NextMessage::EndOfStream),
                Ok(None) => {}
            }

            let n = self.reader.read(&mut self.read_tmp).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&self.read_tmp[..n]);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
