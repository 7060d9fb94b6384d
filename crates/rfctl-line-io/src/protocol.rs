//! Line framing for text command/response instruments.
//!
//! Outbound commands are terminated with `\r\n`. Inbound data is split on
//! `\r`, `\n`, or `\r\n`; each line is decoded ignoring invalid UTF-8 and
//! trimmed, and blank lines are dropped. The grammar of the lines
//! themselves is opaque here.

/// Terminator appended to every outbound command.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Longest partial line kept while waiting for its terminator.
///
/// Status lines are typically a few dozen bytes; a buffer this long
/// without a terminator means noise or a baud-rate mismatch.
pub const MAX_LINE: usize = 4096;

/// Frame a command for the wire.
///
/// # Example
///
/// ```
/// use rfctl_line_io::protocol::encode_command;
///
/// assert_eq!(encode_command("STATUS?"), b"STATUS?\r\n");
/// ```
pub fn encode_command(cmd: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(cmd.len() + LINE_TERMINATOR.len());
    bytes.extend_from_slice(cmd.as_bytes());
    bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
    bytes
}

/// Decode one line body, dropping bytes that are not valid UTF-8.
pub fn decode_line(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Incremental splitter turning a byte stream into lines.
///
/// Bytes are appended with [`push`](Self::push); complete lines are taken
/// with [`next_line`](Self::next_line). Incomplete trailing data stays
/// buffered for the next read.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes.
    ///
    /// If the pending partial line grows past [`MAX_LINE`] the buffer is
    /// reset and `false` is returned so the caller can log the resync.
    pub fn push(&mut self, data: &[u8]) -> bool {
        self.buf.extend_from_slice(data);
        if self.buf.len() > MAX_LINE && !self.buf.iter().any(|&b| is_terminator(b)) {
            self.buf.clear();
            return false;
        }
        true
    }

    /// Take the next non-blank complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self.buf.iter().position(|&b| is_terminator(b))?;
            let line = decode_line(&self.buf[..pos]);
            self.buf.drain(..=pos);
            if !line.is_empty() {
                return Some(line);
            }
        }
    }

    /// Whether a complete line is waiting.
    pub fn has_line(&self) -> bool {
        self.buf.iter().any(|&b| is_terminator(b))
    }

    /// Bytes buffered, complete or not.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

fn is_terminator(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // encode / decode
    // -----------------------------------------------------------------------

    #[test]
    fn encode_appends_crlf() {
        assert_eq!(encode_command("SETFREQ 1000000000"), b"SETFREQ 1000000000\r\n");
    }

    #[test]
    fn encode_empty_command() {
        assert_eq!(encode_command(""), b"\r\n");
    }

    #[test]
    fn decode_line_trims() {
        assert_eq!(decode_line(b"  STATUS:LOCKED "), "STATUS:LOCKED");
    }

    #[test]
    fn decode_line_ignores_invalid_utf8() {
        assert_eq!(decode_line(&[b'O', 0xFF, b'K']), "OK");
    }

    // -----------------------------------------------------------------------
    // LineDecoder
    // -----------------------------------------------------------------------

    #[test]
    fn decoder_crlf_line() {
        let mut d = LineDecoder::new();
        d.push(b"STATUS:LOCKED,FREQ=2400.0\r\n");
        assert_eq!(d.next_line().as_deref(), Some("STATUS:LOCKED,FREQ=2400.0"));
        assert_eq!(d.next_line(), None);
        assert_eq!(d.buffered(), 0);
    }

    #[test]
    fn decoder_bare_cr_and_lf() {
        let mut d = LineDecoder::new();
        d.push(b"A\rB\nC\r\n");
        assert_eq!(d.next_line().as_deref(), Some("A"));
        assert_eq!(d.next_line().as_deref(), Some("B"));
        assert_eq!(d.next_line().as_deref(), Some("C"));
        assert_eq!(d.next_line(), None);
    }

    #[test]
    fn decoder_partial_line_waits() {
        let mut d = LineDecoder::new();
        d.push(b"STAT");
        assert!(!d.has_line());
        assert_eq!(d.next_line(), None);
        d.push(b"US:OK\n");
        assert!(d.has_line());
        assert_eq!(d.next_line().as_deref(), Some("STATUS:OK"));
    }

    #[test]
    fn decoder_skips_blank_lines() {
        let mut d = LineDecoder::new();
        d.push(b"\r\n\r\n  \r\nOK\r\n");
        assert_eq!(d.next_line().as_deref(), Some("OK"));
        assert_eq!(d.next_line(), None);
    }

    #[test]
    fn decoder_keeps_incomplete_tail() {
        let mut d = LineDecoder::new();
        d.push(b"ONE\r\nTW");
        assert_eq!(d.next_line().as_deref(), Some("ONE"));
        assert_eq!(d.next_line(), None);
        assert_eq!(d.buffered(), 2);
    }

    #[test]
    fn decoder_overflow_resets() {
        let mut d = LineDecoder::new();
        let garbage = vec![b'A'; MAX_LINE + 1];
        assert!(!d.push(&garbage));
        assert_eq!(d.buffered(), 0);
        assert!(d.push(b"OK\n"));
        assert_eq!(d.next_line().as_deref(), Some("OK"));
    }

    #[test]
    fn decoder_clear() {
        let mut d = LineDecoder::new();
        d.push(b"PARTIAL");
        d.clear();
        assert_eq!(d.buffered(), 0);
    }
}
