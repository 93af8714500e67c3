//! Text sinks.

use encoding_rs::{Encoding, UTF_8};
use std::cell::{RefCell, RefMut};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::charset::encode_text;
use crate::models::LineSeparator;

/// Destination of text lines.
///
/// Every write operation opens a fresh output, and releases it when the
/// operation ends, whether it succeeded or not.
pub trait TextWriter {
    /// Open the underlying byte stream.
    fn open(&self) -> io::Result<Box<dyn Write + '_>>;

    /// Output charset.
    fn charset(&self) -> &'static Encoding {
        UTF_8
    }

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;

    /// Run `f` against a freshly opened sink, then flush it.
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&mut LineSink<'_>) -> Result<T, E>,
        E: From<io::Error>,
    {
        let mut sink = LineSink::new(self.open()?, self.charset());
        let value = f(&mut sink)?;
        sink.finish()?;
        Ok(value)
    }

    /// Write every line followed by `separator`, returning the line count.
    fn write_lines<I>(&self, lines: I, separator: LineSeparator) -> io::Result<u64>
    where
        Self: Sized,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.write(|sink| {
            for line in lines {
                sink.write_line(line.as_ref(), separator)?;
            }
            Ok(sink.lines_written())
        })
    }

    /// Write `text` as is.
    fn write_text(&self, text: &str) -> io::Result<()>
    where
        Self: Sized,
    {
        self.write(|sink| sink.write_text(text))
    }
}

/// An open, buffered sink handed to [`TextWriter::write`] callbacks.
pub struct LineSink<'a> {
    out: BufWriter<Box<dyn Write + 'a>>,
    charset: &'static Encoding,
    lines: u64,
}

impl<'a> LineSink<'a> {
    fn new(out: Box<dyn Write + 'a>, charset: &'static Encoding) -> Self {
        Self {
            out: BufWriter::new(out),
            charset,
            lines: 0,
        }
    }

    /// Write one line and its separator.
    pub fn write_line(&mut self, line: &str, separator: LineSeparator) -> io::Result<()> {
        self.write_text(line)?;
        self.write_text(separator.value())?;
        self.lines += 1;
        Ok(())
    }

    pub fn write_text(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.out.write_all(&encode_text(text, self.charset))
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    fn finish(mut self) -> io::Result<()> {
        self.out.flush()
    }
}

// =============================================================================
// File sink
// =============================================================================

/// Sink writing to a file, truncating it unless appending.
#[derive(Debug, Clone)]
pub struct FileWriter {
    path: PathBuf,
    charset: &'static Encoding,
    append: bool,
}

impl FileWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            charset: UTF_8,
            append: false,
        }
    }

    pub fn with_charset(mut self, charset: &'static Encoding) -> Self {
        self.charset = charset;
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextWriter for FileWriter {
    fn open(&self) -> io::Result<Box<dyn Write + '_>> {
        let mut options = OpenOptions::new();
        options.create(true);
        if self.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        Ok(Box::new(options.open(&self.path)?))
    }

    fn charset(&self) -> &'static Encoding {
        self.charset
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// =============================================================================
// Stream sink
// =============================================================================

/// Sink over an existing stream, which stays open after each write.
///
/// Only one write operation may hold the stream at a time.
pub struct StreamWriter<W> {
    inner: RefCell<W>,
    charset: &'static Encoding,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: RefCell::new(inner),
            charset: UTF_8,
        }
    }

    pub fn with_charset(mut self, charset: &'static Encoding) -> Self {
        self.charset = charset;
        self
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W: Write> TextWriter for StreamWriter<W> {
    fn open(&self) -> io::Result<Box<dyn Write + '_>> {
        let guard = self
            .inner
            .try_borrow_mut()
            .map_err(|_| io::Error::new(io::ErrorKind::WouldBlock, "stream is already open"))?;
        Ok(Box::new(Borrowed(guard)))
    }

    fn charset(&self) -> &'static Encoding {
        self.charset
    }

    fn describe(&self) -> String {
        "stream".to_string()
    }
}

struct Borrowed<'a, W>(RefMut<'a, W>);

impl<W: Write> Write for Borrowed<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;
    use tempfile::tempdir;

    #[test]
    fn test_write_lines_counts() {
        let writer = StreamWriter::new(Vec::new());
        let n = writer
            .write_lines((1..=3).map(|n| format!("Line {}", n)), LineSeparator::CrLf)
            .unwrap();

        assert_eq!(n, 3);
        assert_eq!(writer.into_inner(), b"Line 1\r\nLine 2\r\nLine 3\r\n");
    }

    #[test]
    fn test_stream_stays_usable_between_writes() {
        let writer = StreamWriter::new(Vec::new());
        writer.write_text("a").unwrap();
        writer.write_text("b").unwrap();
        assert_eq!(writer.into_inner(), b"ab");
    }

    #[test]
    fn test_nested_open_refused() {
        let writer = StreamWriter::new(Vec::new());
        let err = writer
            .write(|_| writer.write_text("nested"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_file_writer_charset_and_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        FileWriter::new(&path)
            .with_charset(WINDOWS_1252)
            .write_lines(["café"], LineSeparator::Lf)
            .unwrap();
        FileWriter::new(&path)
            .append(true)
            .write_lines(["x"], LineSeparator::Lf)
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, b"caf\xE9\nx\n");
    }

    #[test]
    fn test_file_writer_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old content that is longer").unwrap();

        FileWriter::new(&path).write_text("new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_error_in_callback_releases_stream() {
        let writer = StreamWriter::new(Vec::new());
        let result: io::Result<()> = writer.write(|sink| {
            sink.write_text("partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "boom"))
        });
        assert!(result.is_err());

        // the stream is free again
        writer.write_text("!").unwrap();
    }
}
