//! Output accumulator for prompt detection.
//!
//! Only the last `search_depth` bytes are matched against prompt patterns.
//! A `show running-config` from a stacked access switch runs to hundreds of
//! kilobytes and is read in many small chunks, so rescanning all of it on
//! every chunk would be quadratic.

use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Shell output with terminal escapes removed.
pub struct PatternBuffer {
    data: Vec<u8>,
    search_depth: usize,
    /// Carries escape sequences split across reads.
    parser: Parser,
}

/// Keeps printable text plus CR, LF and TAB.
struct Printable<'a>(&'a mut Vec<u8>);

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.0.push(byte);
        }
    }
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            data: Vec::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Append raw output.
    pub fn extend(&mut self, raw: &[u8]) {
        self.parser.advance(&mut Printable(&mut self.data), raw);
    }

    fn tail(&self) -> &[u8] {
        let start = self.data.len().saturating_sub(self.search_depth);
        &self.data[start..]
    }

    /// Whether `pattern` matches within the last `search_depth` bytes.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.tail())
    }

    /// Take the contents, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.data.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_codes_removed() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mconnected\x1b[0m\r\n");
        assert_eq!(buffer.as_slice(), b"connected\r\n");
    }

    #[test]
    fn test_escape_split_across_reads() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"switch\x1b[");
        buffer.extend(b"0m#");
        assert_eq!(buffer.as_slice(), b"switch#");
    }

    #[test]
    fn test_backspace_dropped() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Gi1/0/1\x08 \x08");
        assert_eq!(buffer.as_slice(), b"Gi1/0/1 ");
    }

    #[test]
    fn test_only_tail_is_searched() {
        let prompt = Regex::new(r"switch#$").unwrap();

        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nswitch#");
        assert!(buffer.tail_contains(&prompt));

        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"switch#");
        buffer.extend(&[b'x'; 100]);
        assert!(!buffer.tail_contains(&Regex::new(r"switch#").unwrap()));
    }

    #[test]
    fn test_take_empties() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"sw1>");
        assert_eq!(buffer.take(), b"sw1>");
        assert!(buffer.is_empty());
    }
}
