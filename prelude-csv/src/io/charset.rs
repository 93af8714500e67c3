//! Charset detection and streaming transcoding.

use encoding_rs::{CoderResult, Encoding, UTF_8, WINDOWS_1252};
use std::io::{self, Read};

/// Bytes sampled for charset detection.
pub const DETECTION_SAMPLE: usize = 8 * 1024;

const BUFFER_SIZE: usize = 16 * 1024;

/// Detect the encoding of a byte sample using chardet.
pub fn detect_encoding(sample: &[u8]) -> &'static Encoding {
    if sample.is_empty() {
        return UTF_8;
    }

    let (charset, _confidence, _language) = chardet::detect(sample);

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => UTF_8,
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => WINDOWS_1252,
        _ => {
            let label = chardet::charset2encoding(&charset);
            Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8)
        }
    }
}

/// Resolve a WHATWG encoding label such as `utf-8`, `latin1` or `shift_jis`.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Encode text for output in `charset`.
///
/// Unmappable characters become HTML numeric character references, as
/// encoding_rs does for every non-UTF output encoding.
pub fn encode_text<'a>(text: &'a str, charset: &'static Encoding) -> std::borrow::Cow<'a, [u8]> {
    if charset == UTF_8 {
        return std::borrow::Cow::Borrowed(text.as_bytes());
    }
    let (bytes, _, _) = charset.encode(text);
    bytes
}

/// Reader yielding UTF-8 decoded from `charset`, chunk by chunk.
///
/// A byte order mark, if present, overrides `charset` and is removed.
pub struct DecodingReader<R> {
    inner: R,
    decoder: encoding_rs::Decoder,
    input: Vec<u8>,
    in_start: usize,
    in_end: usize,
    output: Vec<u8>,
    out_start: usize,
    out_end: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, charset: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: charset.new_decoder(),
            input: vec![0; BUFFER_SIZE],
            in_start: 0,
            in_end: 0,
            output: vec![0; BUFFER_SIZE * 3],
            out_start: 0,
            out_end: 0,
            eof: false,
            finished: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.out_start < self.out_end {
                let n = buf.len().min(self.out_end - self.out_start);
                buf[..n].copy_from_slice(&self.output[self.out_start..self.out_start + n]);
                self.out_start += n;
                return Ok(n);
            }

            if self.finished {
                return Ok(0);
            }

            if self.in_start == self.in_end && !self.eof {
                let n = self.inner.read(&mut self.input)?;
                self.in_start = 0;
                self.in_end = n;
                self.eof = n == 0;
            }

            let (result, read, written, _) = self.decoder.decode_to_utf8(
                &self.input[self.in_start..self.in_end],
                &mut self.output,
                self.eof,
            );
            self.in_start += read;
            self.out_start = 0;
            self.out_end = written;

            if self.eof && result == CoderResult::InputEmpty {
                self.finished = true;
            }
        }
    }
}
