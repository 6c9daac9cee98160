//! Newline frame reassembly over the raw byte stream.
//!
//! Bytes arrive in arbitrary chunks from the transport; the frame buffer
//! accumulates them and emits one complete frame per delimiter. A frame
//! that grows past the configured bound is abandoned: the buffer is
//! cleared, an overflow event is emitted, and everything up to the next
//! delimiter is discarded so the stream resynchronizes cleanly.

/// Frame delimiter on the wire.
pub const DELIMITER: u8 = b'\n';

/// Outcome of scanning newly arrived bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// One complete frame, delimiter (and any trailing CR) stripped.
    Frame(Vec<u8>),
    /// The accumulation bound was exceeded before a delimiter arrived.
    TooLarge { dropped: usize },
}

/// Accumulation buffer with a hard size bound.
pub struct FrameBuffer {
    buf: Vec<u8>,
    max_frame: usize,
    /// Set after an overflow; swallow bytes until the next delimiter.
    discarding: bool,
}

impl FrameBuffer {
    pub fn new(max_frame: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame,
            discarding: false,
        }
    }

    /// Append incoming bytes and return every event they complete.
    /// Splitting the same bytes across multiple calls yields identical
    /// events to delivering them at once.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<FrameEvent> {
        let mut events = Vec::new();
        for &byte in bytes {
            if byte == DELIMITER {
                if self.discarding {
                    self.discarding = false;
                    continue;
                }
                let mut frame = std::mem::take(&mut self.buf);
                if frame.last() == Some(&b'\r') {
                    frame.pop();
                }
                // Blank lines are keep-alives, not requests.
                if !frame.is_empty() {
                    events.push(FrameEvent::Frame(frame));
                }
            } else if !self.discarding {
                self.buf.push(byte);
                if self.buf.len() > self.max_frame {
                    let dropped = self.buf.len();
                    self.buf.clear();
                    self.discarding = true;
                    events.push(FrameEvent::TooLarge { dropped });
                }
            }
        }
        events
    }

    /// Bytes currently buffered awaiting a delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
