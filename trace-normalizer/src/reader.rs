//! Size-bounded line reader
//!
//! Backends may print very large single lines (full stack or memory dumps).
//! The reader buffers a line up to a hard cap; anything longer is skipped
//! through to the next newline without being held in memory.

use std::io::{self, BufRead, BufReader, ErrorKind, Read};

/// Initial line buffer capacity (1 MiB)
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024 * 1024;

/// Hard cap on a buffered line (32 MiB)
pub const DEFAULT_MAX_LINE: usize = 32 * 1024 * 1024;

/// A line produced by [`LineReader`]
#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    /// Line contents without the terminator
    Complete(&'a [u8]),
    /// Line longer than the cap; its contents were discarded
    Oversized { len: usize },
}

/// Incremental line reader with a bounded buffer
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    max_line: usize,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limits(inner, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_LINE)
    }

    /// Create a reader starting with `initial` bytes of line buffer, allowed
    /// to grow up to `max_line`.
    pub fn with_limits(inner: R, initial: usize, max_line: usize) -> Self {
        let initial = initial.min(max_line);
        Self {
            inner: BufReader::with_capacity(initial.max(1), inner),
            buf: Vec::with_capacity(initial),
            max_line,
        }
    }

    /// Read the next line. Returns `Ok(None)` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<Line<'_>>> {
        self.buf.clear();
        let mut seen = false;
        // Total length of the current line once it went over the cap.
        let mut overflow: Option<usize> = None;

        loop {
            let (used, done) = {
                let available = match self.inner.fill_buf() {
                    Ok(available) => available,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                if available.is_empty() {
                    if !seen {
                        return Ok(None);
                    }
                    break;
                }
                seen = true;
                let (chunk, used, done) = match available.iter().position(|&b| b == b'\n') {
                    Some(i) => (&available[..i], i + 1, true),
                    None => (available, available.len(), false),
                };
                match overflow.as_mut() {
                    Some(len) => *len += chunk.len(),
                    None if self.buf.len() + chunk.len() > self.max_line => {
                        overflow = Some(self.buf.len() + chunk.len());
                        self.buf.clear();
                    }
                    None => self.buf.extend_from_slice(chunk),
                }
                (used, done)
            };
            self.inner.consume(used);
            if done {
                break;
            }
        }

        if let Some(len) = overflow {
            return Ok(Some(Line::Oversized { len }));
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        Ok(Some(Line::Complete(&self.buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &[u8], initial: usize, max: usize) -> Vec<String> {
        let mut reader = LineReader::with_limits(input, initial, max);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().unwrap() {
            lines.push(match line {
                Line::Complete(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                Line::Oversized { len } => format!("<oversized {len}>"),
            });
        }
        lines
    }

    #[test]
    fn test_splits_lines() {
        assert_eq!(collect(b"a\nbb\n\nccc", 4, 16), vec!["a", "bb", "", "ccc"]);
    }

    #[test]
    fn test_strips_carriage_return() {
        assert_eq!(collect(b"one\r\ntwo\r\n", 4, 16), vec!["one", "two"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(collect(b"", 4, 16).is_empty());
    }

    #[test]
    fn test_line_grows_past_initial_capacity() {
        let long = "x".repeat(40);
        let input = format!("{long}\nshort\n");
        assert_eq!(collect(input.as_bytes(), 2, 64), vec![long.as_str(), "short"]);
    }

    #[test]
    fn test_line_at_cap_is_kept() {
        let exact = "y".repeat(16);
        let input = format!("{exact}\n");
        assert_eq!(collect(input.as_bytes(), 4, 16), vec![exact]);
    }

    #[test]
    fn test_oversized_line_is_skipped() {
        let long = "z".repeat(100);
        let input = format!("first\n{long}\nlast\n");
        assert_eq!(
            collect(input.as_bytes(), 4, 16),
            vec!["first", "<oversized 100>", "last"]
        );
    }

    #[test]
    fn test_oversized_final_line_without_newline() {
        let long = "w".repeat(33);
        assert_eq!(collect(long.as_bytes(), 8, 32), vec!["<oversized 33>"]);
    }
}
