// src/execution/line_capture.rs

//! Line-oriented capture of script output
//!
//! Recipes communicate with the orchestrator through their output stream:
//! the last full line of stderr becomes the diagnostic attached to a
//! failure. `LineCaptureBuffer` accumulates written bytes, splits them on
//! newlines, and keeps both every completed line and the most recent one.

use std::io::Write;

#[derive(Debug, Default)]
pub struct LineCaptureBuffer {
    lines: Vec<String>,
    current: String,
    last_full_line: String,
}

impl LineCaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a complete chunk of output in one call.
    pub fn from_output(bytes: &[u8]) -> Self {
        let mut buffer = Self::new();
        // Writing to an in-memory buffer cannot fail
        let _ = buffer.write_all(bytes);
        buffer
    }

    /// The most recent line terminated by a newline.
    pub fn last_full_line(&self) -> &str {
        &self.last_full_line
    }

    /// Every completed line, in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.current.is_empty()
    }
}

impl Write for LineCaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for ch in text.chars() {
            if ch == '\n' {
                let line = std::mem::take(&mut self.current);
                self.last_full_line = line.clone();
                self.lines.push(line);
            } else {
                self.current.push(ch);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_full_line_ignores_trailing_partial() {
        let buffer = LineCaptureBuffer::from_output(b"first\nsecond\npartial");
        assert_eq!(buffer.last_full_line(), "second");
        assert_eq!(buffer.lines(), ["first", "second"]);
    }

    #[test]
    fn test_lines_split_across_writes() {
        let mut buffer = LineCaptureBuffer::new();
        buffer.write_all(b"hel").unwrap();
        buffer.write_all(b"lo\nwor").unwrap();
        buffer.write_all(b"ld\n").unwrap();
        assert_eq!(buffer.lines(), ["hello", "world"]);
        assert_eq!(buffer.last_full_line(), "world");
    }

    #[test]
    fn test_empty_output() {
        let buffer = LineCaptureBuffer::from_output(b"");
        assert!(buffer.is_empty());
        assert_eq!(buffer.last_full_line(), "");
    }
}
