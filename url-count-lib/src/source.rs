//! Line source adapter.
//!
//! Wraps a blocking, line-buffered reader and hands out one URL per call.
//! The producer stage calls it from a blocking thread.

use crate::error::UrlCountError;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Stdin};
use std::path::Path;
use tracing::warn;

/// Longest line accepted, in bytes, excluding the newline.
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// A blocking producer of input lines.
///
/// `Ok(None)` means end-of-stream. Implementations should be fused: once
/// they have returned `Ok(None)` or an error, further calls return `Ok(None)`.
pub trait LineSource: Send + 'static {
    fn next_line(&mut self) -> Result<Option<String>, UrlCountError>;

    /// Number of lines consumed from the underlying reader but not returned
    /// (blank lines, comments).
    fn skipped(&self) -> usize {
        0
    }
}

impl LineSource for Box<dyn LineSource> {
    fn next_line(&mut self) -> Result<Option<String>, UrlCountError> {
        (**self).next_line()
    }

    fn skipped(&self) -> usize {
        (**self).skipped()
    }
}

/// [`LineSource`] over any [`BufRead`].
///
/// Lines are split on `\n` with a trailing `\r` removed, decoded lossily as
/// UTF-8 and trimmed. Blank lines, lines starting with `#`, and lines longer
/// than [`MAX_LINE_BYTES`] are skipped.
pub struct ReaderLineSource<R> {
    reader: R,
    buf: Vec<u8>,
    finished: bool,
    skipped: usize,
}

impl<R: BufRead> ReaderLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            finished: false,
            skipped: 0,
        }
    }

    /// Read at most one line (plus its newline) into `buf`.
    fn read_capped(&mut self) -> io::Result<usize> {
        let limit = (MAX_LINE_BYTES + 1) as u64;
        (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf)
    }

    /// Consume input up to and including the next newline without buffering it.
    fn discard_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            let available = match self.reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(());
            }

            match available.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    self.reader.consume(end + 1);
                    return Ok(());
                }
                None => {
                    let len = available.len();
                    self.reader.consume(len);
                }
            }
        }
    }
}

impl ReaderLineSource<BufReader<Stdin>> {
    /// Read URLs from the process's standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()))
    }
}

impl ReaderLineSource<BufReader<File>> {
    /// Read URLs from a file, one per line.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, UrlCountError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            UrlCountError::file_error(path.to_string_lossy(), format!("Cannot open file: {}", e))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead + Send + 'static> LineSource for ReaderLineSource<R> {
    fn next_line(&mut self) -> Result<Option<String>, UrlCountError> {
        while !self.finished {
            self.buf.clear();
            let read = match self.read_capped() {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(e.into());
                }
            };

            if read == 0 {
                self.finished = true;
                break;
            }

            if self.buf.len() > MAX_LINE_BYTES && self.buf.last() != Some(&b'\n') {
                warn!(limit = MAX_LINE_BYTES, "skipping over-long input line");
                self.skipped += 1;
                if let Err(e) = self.discard_rest_of_line() {
                    self.finished = true;
                    return Err(e.into());
                }
                continue;
            }

            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                self.skipped += 1;
                continue;
            }
            return Ok(Some(line.to_string()));
        }

        Ok(None)
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn drain<S: LineSource>(source: &mut S) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_reads_lines_and_strips_endings() {
        let mut source =
            ReaderLineSource::new(Cursor::new("http://a.test\r\nhttp://b.test\nhttp://c.test"));
        assert_eq!(
            drain(&mut source),
            vec!["http://a.test", "http://b.test", "http://c.test"]
        );
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let mut source =
            ReaderLineSource::new(Cursor::new("\n# list\nhttp://a.test\n   \nhttp://b.test\n"));
        assert_eq!(drain(&mut source), vec!["http://a.test", "http://b.test"]);
        assert_eq!(source.skipped(), 3);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut source = ReaderLineSource::new(Cursor::new("http://a.test\nhttp://a.test\n"));
        assert_eq!(drain(&mut source).len(), 2);
    }

    #[test]
    fn test_fused_after_end_of_stream() {
        let mut source = ReaderLineSource::new(Cursor::new("http://a.test\n"));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("http://a.test"));
        assert_eq!(source.next_line().unwrap(), None);
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_does_not_end_stream() {
        let bytes: Vec<u8> = b"http://a.test/\xff\nhttp://b.test\n".to_vec();
        let mut source = ReaderLineSource::new(Cursor::new(bytes));
        let lines = drain(&mut source);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "http://b.test");
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
            }
            self.served = true;
            let line = b"http://a.test\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn test_io_error_is_surfaced_then_fused() {
        let mut source = ReaderLineSource::new(BufReader::new(FailingReader { served: false }));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("http://a.test"));

        let err = source.next_line().unwrap_err();
        assert!(matches!(err, UrlCountError::Input { .. }));
        assert!(err.to_string().contains("disk on fire"));

        assert_eq!(source.next_line().unwrap(), None);
    }

    #[test]
    fn test_over_long_line_is_skipped() {
        let long = format!("http://a.test/{}", "x".repeat(MAX_LINE_BYTES * 3));
        let input = format!("http://first.test\n{}\nhttp://last.test\n", long);
        let mut source = ReaderLineSource::new(Cursor::new(input));

        assert_eq!(drain(&mut source), vec!["http://first.test", "http://last.test"]);
        assert_eq!(source.skipped(), 1);
    }

    #[test]
    fn test_line_at_limit_is_kept() {
        let exact = "y".repeat(MAX_LINE_BYTES);
        let mut source = ReaderLineSource::new(Cursor::new(format!("{}\n", exact)));
        assert_eq!(drain(&mut source), vec![exact]);

        // Unterminated over-long tail at end of input.
        let tail = "z".repeat(MAX_LINE_BYTES + 1);
        let mut source = ReaderLineSource::new(Cursor::new(format!("http://a.test\n{}", tail)));
        assert_eq!(drain(&mut source), vec!["http://a.test"]);
        assert_eq!(source.skipped(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let err = ReaderLineSource::open("/definitely/not/here.txt")
            .err()
            .unwrap();
        assert!(matches!(err, UrlCountError::File { .. }));
    }
}
