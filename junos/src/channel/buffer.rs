//! NETCONF 1.0 end-of-message framing.
//!
//! Messages on a base:1.0 session are terminated by `]]>]]>`. Data arrives
//! from the SSH channel in arbitrary chunks, so the buffer keeps a scan
//! offset and only searches bytes that could complete a new delimiter.

use bytes::{Buf, BytesMut};
use memchr::memmem;

/// NETCONF 1.0 message delimiter.
pub const DELIMITER: &[u8] = b"]]>]]>";

/// Append the end-of-message delimiter to an XML document.
pub fn frame(xml: &str) -> String {
    let mut framed = String::with_capacity(xml.len() + DELIMITER.len() + 1);
    framed.push_str(xml);
    framed.push('\n');
    framed.push_str("]]>]]>");
    framed
}

/// Buffer for accumulating channel output and splitting it into messages.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Accumulated bytes not yet returned as a message.
    buffer: BytesMut,

    /// Offset before which no delimiter can start.
    scanned: usize,
}

impl FrameBuffer {
    /// Create an empty buffer with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            scanned: 0,
        }
    }

    /// Append raw channel data.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Pop the next complete message, without its delimiter.
    ///
    /// Leading whitespace between messages is dropped.
    pub fn next_message(&mut self) -> Option<Vec<u8>> {
        let finder = memmem::Finder::new(DELIMITER);
        match finder.find(&self.buffer[self.scanned..]) {
            Some(pos) => {
                let end = self.scanned + pos;
                let message = self.buffer.split_to(end);
                self.buffer.advance(DELIMITER.len());
                self.scanned = 0;

                let start = message
                    .iter()
                    .position(|b| !b.is_ascii_whitespace())
                    .unwrap_or(message.len());
                Some(message[start..].to_vec())
            }
            None => {
                // A delimiter may straddle the next chunk boundary
                self.scanned = self.buffer.len().saturating_sub(DELIMITER.len() - 1);
                None
            }
        }
    }

    /// Bytes waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered data.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::with_capacity(8192)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_message() {
        let mut buffer = FrameBuffer::default();
        buffer.extend(b"<rpc-reply><ok/></rpc-reply>]]>]]>");
        assert_eq!(buffer.next_message().unwrap(), b"<rpc-reply><ok/></rpc-reply>");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_message_waits() {
        let mut buffer = FrameBuffer::default();
        buffer.extend(b"<rpc-reply><ok/>");
        assert!(buffer.next_message().is_none());
        buffer.extend(b"</rpc-reply>]]>]]>");
        assert_eq!(buffer.next_message().unwrap(), b"<rpc-reply><ok/></rpc-reply>");
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        let mut buffer = FrameBuffer::default();
        buffer.extend(b"<hello/>]]>");
        assert!(buffer.next_message().is_none());
        buffer.extend(b"]]>");
        assert_eq!(buffer.next_message().unwrap(), b"<hello/>");
    }

    #[test]
    fn test_two_messages_in_one_chunk() {
        let mut buffer = FrameBuffer::default();
        buffer.extend(b"<a/>]]>]]>\n<b/>]]>]]><c");
        assert_eq!(buffer.next_message().unwrap(), b"<a/>");
        assert_eq!(buffer.next_message().unwrap(), b"<b/>");
        assert!(buffer.next_message().is_none());
        assert_eq!(buffer.pending(), 2);
    }

    #[test]
    fn test_frame_appends_delimiter() {
        assert_eq!(frame("<rpc/>"), "<rpc/>\n]]>]]>");
    }
}
