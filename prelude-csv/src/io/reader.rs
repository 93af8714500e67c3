//! Text sources.

use encoding_rs::{Encoding, UTF_8};
use std::cell::{RefCell, RefMut};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use super::charset::{detect_encoding, DecodingReader, DETECTION_SAMPLE};

/// Origin of text.
///
/// A source is read forward only; reading it again means opening it again.
pub trait TextReader {
    /// Open the underlying byte stream.
    fn open(&self) -> io::Result<Box<dyn Read + '_>>;

    /// Input charset, `None` to detect it from the first bytes.
    fn charset(&self) -> Option<&'static Encoding> {
        Some(UTF_8)
    }

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;

    /// Open the source as a UTF-8 stream, transcoding on the fly.
    fn open_text(&self) -> io::Result<Box<dyn Read + '_>> {
        let mut raw = self.open()?;

        let charset = match self.charset() {
            Some(charset) => charset,
            None => {
                let mut sample = Vec::with_capacity(DETECTION_SAMPLE);
                (&mut raw).take(DETECTION_SAMPLE as u64).read_to_end(&mut sample)?;
                let charset = detect_encoding(&sample);
                raw = Box::new(Cursor::new(sample).chain(raw));
                charset
            }
        };

        Ok(Box::new(DecodingReader::new(raw, charset)))
    }

    /// Lazy iterator over the lines of the source.
    fn read_lines(&self) -> io::Result<io::Lines<BufReader<Box<dyn Read + '_>>>> {
        Ok(BufReader::new(self.open_text()?).lines())
    }
}

// =============================================================================
// File source
// =============================================================================

/// Source reading a file.
#[derive(Debug, Clone)]
pub struct FileReader {
    path: PathBuf,
    charset: Option<&'static Encoding>,
}

impl FileReader {
    /// UTF-8 file source.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            charset: Some(UTF_8),
        }
    }

    /// Use `charset`, or detect it when `None`.
    pub fn with_charset(mut self, charset: Option<&'static Encoding>) -> Self {
        self.charset = charset;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextReader for FileReader {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn charset(&self) -> Option<&'static Encoding> {
        self.charset
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// =============================================================================
// Stream source
// =============================================================================

/// Source over an existing stream.
///
/// The stream is consumed by the first read; later opens continue where the
/// previous one stopped.
pub struct StreamReader<R> {
    inner: RefCell<R>,
    charset: Option<&'static Encoding>,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: RefCell::new(inner),
            charset: Some(UTF_8),
        }
    }

    pub fn with_charset(mut self, charset: Option<&'static Encoding>) -> Self {
        self.charset = charset;
        self
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<'t> StreamReader<Cursor<&'t [u8]>> {
    /// Source over in-memory text.
    pub fn from_text(text: &'t str) -> Self {
        Self::new(Cursor::new(text.as_bytes()))
    }
}

impl<R: Read> TextReader for StreamReader<R> {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        let guard = self
            .inner
            .try_borrow_mut()
            .map_err(|_| io::Error::new(io::ErrorKind::WouldBlock, "stream is already open"))?;
        Ok(Box::new(Borrowed(guard)))
    }

    fn charset(&self) -> Option<&'static Encoding> {
        self.charset
    }

    fn describe(&self) -> String {
        "stream".to_string()
    }
}

struct Borrowed<'a, R>(RefMut<'a, R>);

impl<R: Read> Read for Borrowed<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}
