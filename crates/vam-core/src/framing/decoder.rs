//! Frame decoders: where one message ends and the next begins.
//!
//! Both decoders follow the same contract.  The caller appends every chunk of
//! bytes it reads to an accumulation buffer and then calls
//! [`FrameDecoder::decode`] in a loop until it returns `Ok(None)`:
//!
//! ```text
//! loop {
//!     n = read(tmp)
//!     if n == 0 { flush with decode_eof(); break }
//!     buf.extend(tmp[..n])
//!     while let Some(frame) = decoder.decode(&mut buf)? { handle(frame) }
//! }
//! ```
//!
//! A decoder removes the bytes it returns from the buffer.  An `Err` reports
//! one bad frame; the decoder is left in a consistent state and the caller
//! keeps calling `decode`.

use thiserror::Error;

/// A frame that the decoder refused to emit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The frame exceeded the configured maximum and was discarded.
    #[error("frame of {len} bytes exceeds maximum of {max} bytes")]
    TooLong { len: usize, max: usize },
}

/// Splits an accumulation buffer into frames.
pub trait FrameDecoder: Send {
    /// Removes and returns the next complete frame from `buf`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLong`] when a frame is discarded for length.
    fn decode(&mut self, buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, FrameError>;

    /// Like [`decode`](Self::decode), but called once the peer has closed the
    /// stream, so an unterminated tail may be emitted as a final frame.
    ///
    /// # Errors
    ///
    /// Same as [`decode`](Self::decode).
    fn decode_eof(&mut self, buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, FrameError> {
        self.decode(buf)
    }

    /// How many bytes the caller should request per read.
    fn read_size(&self) -> usize;
}

// ── Chunk decoder ─────────────────────────────────────────────────────────────

/// Treats everything that arrived in one read as one frame.
///
/// The caller reads at most [`read_size`](FrameDecoder::read_size) bytes at a
/// time and decodes after every read, so each frame is exactly one read.
#[derive(Debug, Clone)]
pub struct ChunkDecoder {
    chunk_size: usize,
}

impl ChunkDecoder {
    /// Creates a decoder reading `chunk_size` bytes at a time (minimum 1).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl FrameDecoder for ChunkDecoder {
    fn decode(&mut self, buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, FrameError> {
        if buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(std::mem::take(buf)))
    }

    fn read_size(&self) -> usize {
        self.chunk_size
    }
}

// ── Line decoder ──────────────────────────────────────────────────────────────

/// Splits on `\n`, stripping one trailing `\r`.
///
/// A line longer than `max_len` is reported once as [`FrameError::TooLong`]
/// and everything up to its terminating newline is dropped, so the tail of an
/// oversized line is never mistaken for a message of its own.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    read_size: usize,
    max_len: usize,
    /// Set while skipping the remainder of an oversized line.
    discarding: bool,
    /// Bytes of `buf` already searched for a newline.
    scanned: usize,
}

impl LineDecoder {
    /// Creates a decoder that reads `read_size` bytes at a time and accepts
    /// lines of up to `max_len` bytes.
    pub fn new(read_size: usize, max_len: usize) -> Self {
        Self {
            read_size: read_size.max(1),
            max_len,
            discarding: false,
            scanned: 0,
        }
    }
}

fn strip_cr(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

impl FrameDecoder for LineDecoder {
    fn decode(&mut self, buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, FrameError> {
        loop {
            let start = self.scanned.min(buf.len());
            match buf[start..].iter().position(|b| *b == b'\n') {
                Some(offset) => {
                    let end = start + offset;
                    self.scanned = 0;

                    if self.discarding {
                        // Tail of an oversized line: drop it and look again.
                        buf.drain(..=end);
                        self.discarding = false;
                        continue;
                    }

                    let mut line: Vec<u8> = buf.drain(..=end).collect();
                    line.pop();
                    let line = strip_cr(line);
                    if line.len() > self.max_len {
                        return Err(FrameError::TooLong {
                            len: line.len(),
                            max: self.max_len,
                        });
                    }
                    return Ok(Some(line));
                }
                None => {
                    if self.discarding {
                        buf.clear();
                        self.scanned = 0;
                        return Ok(None);
                    }
                    // A trailing `\r` may be the first half of a CRLF split
                    // across reads; it is stripped once the `\n` arrives.
                    let pending = buf.len() - usize::from(buf.last() == Some(&b'\r'));
                    if pending > self.max_len {
                        let len = buf.len();
                        buf.clear();
                        self.scanned = 0;
                        self.discarding = true;
                        return Err(FrameError::TooLong {
                            len,
                            max: self.max_len,
                        });
                    }
                    self.scanned = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, FrameError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        self.scanned = 0;
        if self.discarding {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }
        if buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(strip_cr(std::mem::take(buf))))
    }

    fn read_size(&self) -> usize {
        self.read_size
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
