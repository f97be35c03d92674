//! Streaming line splitter for device output
//!
//! The matrix terminates every status line with `\r\n` but delivers bytes
//! in arbitrary bursts, so the session accumulates here and only ever
//! dispatches complete lines.

/// Cap on buffered bytes; garbage past this point is a misbehaving
/// transport, not a long line
const MAX_BUFFER: usize = 16 * 1024;

/// Accumulates raw bytes and yields complete, terminator-stripped lines
#[derive(Debug, Default)]
pub struct LineCodec {
    buffer: Vec<u8>,
}

impl LineCodec {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    /// Append raw bytes from the transport
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        if self.buffer.len() > MAX_BUFFER {
            let start = self.buffer.len() - MAX_BUFFER / 2;
            tracing::warn!("line buffer overflow, dropping {} oldest bytes", start);
            self.buffer.drain(..start);
        }
    }

    /// Pop the next complete line, if one is buffered.
    ///
    /// Splits on `\n`, strips a trailing `\r`, and skips empty lines (the
    /// device ends bursts with `\r\n\r\n` now and then).
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let newline = self.buffer.iter().position(|&b| b == b'\n')?;
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
    }

    /// Whether a partial, unterminated line is still buffered
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::LineCodec;

    #[test]
    fn splits_complete_lines() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"Power ON!\r\nFront Panel UnLock!\r\n");
        assert_eq!(codec.next_line().as_deref(), Some("Power ON!"));
        assert_eq!(codec.next_line().as_deref(), Some("Front Panel UnLock!"));
        assert_eq!(codec.next_line(), None);
        assert!(!codec.has_partial());
    }

    #[test]
    fn holds_partial_lines() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"Power O");
        assert_eq!(codec.next_line(), None);
        assert!(codec.has_partial());
        codec.push_bytes(b"N!\r\n");
        assert_eq!(codec.next_line().as_deref(), Some("Power ON!"));
        assert!(!codec.has_partial());
    }

    #[test]
    fn skips_blank_lines_and_tolerates_bare_newline() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"\r\n\r\nPower ON!\nV1.0.1\r\n");
        assert_eq!(codec.next_line().as_deref(), Some("Power ON!"));
        assert_eq!(codec.next_line().as_deref(), Some("V1.0.1"));
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn caps_runaway_buffers() {
        let mut codec = LineCodec::new();
        codec.push_bytes(&vec![b'x'; 64 * 1024]);
        assert!(codec.has_partial());
        codec.push_bytes(b"\r\nPower ON!\r\n");
        // the oversized junk line comes out truncated but the stream recovers
        assert!(codec.next_line().is_some());
        assert_eq!(codec.next_line().as_deref(), Some("Power ON!"));
    }
}
