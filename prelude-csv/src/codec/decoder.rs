//! Record decoder: delimited text to named records.

use std::io::{self, Read};
use std::sync::Arc;

use super::record::{HeaderIndex, Record};
use crate::error::GrammarResult;
use crate::format::CsvFormat;
use crate::grammar::{CsvGrammar, FieldStream, Grammar};
use crate::models::Column;

/// Decodes text with a [`CsvFormat`].
#[derive(Debug, Clone)]
pub struct Decoder<'f, G = &'f CsvGrammar> {
    format: &'f CsvFormat,
    grammar: G,
}

impl<'f> Decoder<'f> {
    /// Decoder using the format's import grammar.
    pub fn new(format: &'f CsvFormat) -> Self {
        Self::with_grammar(format, format.import_grammar())
    }
}

impl<'f, G: Grammar> Decoder<'f, G> {
    /// Decoder delegating field splitting to `grammar`.
    pub fn with_grammar(format: &'f CsvFormat, grammar: G) -> Self {
        Self { format, grammar }
    }

    pub fn format(&self) -> &'f CsvFormat {
        self.format
    }

    /// Decode a byte stream, one record per pull.
    pub fn decode_reader<'r, R: Read + 'r>(&self, source: R) -> Records<'r> {
        Records {
            stream: self.grammar.split(Box::new(source)),
            columns: self.format.columns().to_vec(),
            expects_header: self.grammar.expects_header(),
            index: None,
            done: false,
        }
    }

    /// Decode a lazy sequence of text lines.
    ///
    /// Lines are rejoined with `\n` on demand, so a quoted field spanning
    /// several lines still decodes as one field.
    pub fn decode_lines<'r, I>(&self, lines: I) -> Records<'r>
    where
        I: IntoIterator,
        I::IntoIter: 'r,
        I::Item: AsRef<str>,
    {
        self.decode_reader(JoinedLines::new(lines.into_iter()))
    }

    pub fn decode_str<'r>(&self, text: &'r str) -> Records<'r> {
        self.decode_reader(text.as_bytes())
    }
}

// =============================================================================
// Records
// =============================================================================

/// Lazy, single-pass sequence of decoded records.
///
/// The header (if any) is consumed on the first pull. Iteration stops after
/// the first grammar or I/O error.
pub struct Records<'r> {
    stream: FieldStream<'r>,
    columns: Vec<Column>,
    expects_header: bool,
    index: Option<Arc<HeaderIndex>>,
    done: bool,
}

impl Records<'_> {
    /// Physical header, available once the first record has been pulled.
    pub fn header(&self) -> Option<&[String]> {
        self.index.as_deref().and_then(HeaderIndex::header)
    }

    /// Name resolution of this input, available after the first pull.
    pub fn index(&self) -> Option<&HeaderIndex> {
        self.index.as_deref()
    }

    fn resolve_index(&mut self) -> GrammarResult<Option<Arc<HeaderIndex>>> {
        if let Some(index) = &self.index {
            return Ok(Some(Arc::clone(index)));
        }

        let index = if self.expects_header {
            match self.stream.next() {
                Some(header) => HeaderIndex::resolve(&self.columns, header?.fields),
                None => return Ok(None),
            }
        } else {
            HeaderIndex::positional()
        };

        let index = Arc::new(index);
        self.index = Some(Arc::clone(&index));
        Ok(Some(index))
    }
}

impl Iterator for Records<'_> {
    type Item = GrammarResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let index = match self.resolve_index() {
            Ok(Some(index)) => index,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        match self.stream.next() {
            Some(Ok(parsed)) => Some(Ok(Record::new(parsed.fields, parsed.line, index))),
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl std::fmt::Debug for Records<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Records")
            .field("columns", &self.columns)
            .field("expects_header", &self.expects_header)
            .field("index", &self.index)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Line joining
// =============================================================================

/// Presents a sequence of lines as a byte stream, `\n` after each line.
struct JoinedLines<I> {
    lines: I,
    pending: Vec<u8>,
    offset: usize,
}

impl<I> JoinedLines<I> {
    fn new(lines: I) -> Self {
        Self {
            lines,
            pending: Vec::new(),
            offset: 0,
        }
    }
}

impl<I> Read for JoinedLines<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.offset >= self.pending.len() {
            let Some(line) = self.lines.next() else {
                return Ok(0);
            };
            self.pending.clear();
            self.pending.extend_from_slice(line.as_ref().as_bytes());
            self.pending.push(b'\n');
            self.offset = 0;
        }

        let n = buf.len().min(self.pending.len() - self.offset);
        buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GrammarError, ResolutionError};

    fn people() -> CsvFormat {
        CsvFormat::builder()
            .columns([
                ("firstName", "FIRST_NAME"),
                ("lastName", "LAST_NAME"),
                ("country", "COUNTRY"),
            ])
            .delimiter(';')
            .build()
            .unwrap()
    }

    #[test]
    fn test_header_order_independent() {
        let format = people();
        let declared = "FIRST_NAME;LAST_NAME;COUNTRY\nAda;Lovelace;UK\n";
        let permuted = "COUNTRY;LAST_NAME;FIRST_NAME\nUK;Lovelace;Ada\n";

        let a: Vec<Record> = format.decoder().decode_str(declared).map(|r| r.unwrap()).collect();
        let b: Vec<Record> = format.decoder().decode_str(permuted).map(|r| r.unwrap()).collect();

        for name in ["firstName", "lastName", "country"] {
            assert_eq!(a[0].get(name).unwrap(), b[0].get(name).unwrap());
        }
        assert_eq!(b[0].get("firstName").unwrap(), "Ada");
    }

    #[test]
    fn test_header_exposed_after_first_pull() {
        let format = people();
        let mut records = format.decoder().decode_str("COUNTRY;FIRST_NAME\nUK;Ada\n");
        assert!(records.header().is_none());

        let first = records.next().unwrap().unwrap();
        assert_eq!(first.line(), 2);
        assert_eq!(records.header().unwrap(), &["COUNTRY", "FIRST_NAME"]);
    }

    #[test]
    fn test_missing_column_does_not_stop_iteration() {
        let format = people();
        let text = "FIRST_NAME;LAST_NAME\nAda;Lovelace\nAlan;Turing\n";

        let mut seen = 0;
        for record in format.decoder().decode_str(text) {
            let record = record.unwrap();
            assert!(matches!(
                record.get("country"),
                Err(ResolutionError::NotFound(ref name)) if name == "country"
            ));
            assert!(record.get("lastName").is_ok());
            seen += 1;
        }
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_schemaless_reads_every_line_as_data() {
        let format = CsvFormat::builder().build().unwrap();
        let records: Vec<Record> = format
            .decoder()
            .decode_str("a,b\n1,2\n")
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_at(0).unwrap(), "a");
        assert!(records[0].header().is_none());
        assert!(matches!(records[1].get("a"), Err(ResolutionError::NotFound(_))));
    }

    #[test]
    fn test_ragged_rows() {
        let format = CsvFormat::builder().columns(["A", "B"]).build().unwrap();
        let records: Vec<Record> = format
            .decoder()
            .decode_str("A,B\n1\n1,2,3\n")
            .map(|r| r.unwrap())
            .collect();

        assert!(matches!(records[0].get("B"), Err(ResolutionError::MissingField { .. })));
        assert_eq!(records[1].get_at(2).unwrap(), "3");
    }

    #[test]
    fn test_auto_trim_on_decode() {
        let format = CsvFormat::builder().columns(["v"]).auto_trim(true).build().unwrap();
        let record = format
            .decoder()
            .decode_str(" v \n  x  \n")
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(record.get("v").unwrap(), "x");
    }

    #[test]
    fn test_decode_lines_rejoins_quoted_newlines() {
        let format = CsvFormat::builder().columns(["note", "n"]).build().unwrap();
        let lines = vec!["note,n", "\"first", "second\",1"];
        let record = format
            .decoder()
            .decode_lines(lines)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(record.get("note").unwrap(), "first\nsecond");
        assert_eq!(record.get("n").unwrap(), "1");
    }

    #[test]
    fn test_empty_and_header_only_inputs() {
        let format = people();
        assert_eq!(format.decoder().decode_str("").count(), 0);

        let mut records = format.decoder().decode_str("FIRST_NAME\n");
        assert!(records.next().is_none());
        assert_eq!(records.header().unwrap(), &["FIRST_NAME"]);
    }

    #[test]
    fn test_error_terminates_sequence() {
        let format = CsvFormat::builder().build().unwrap();
        let bytes: &[u8] = b"ok\n\xff\nnever\n";
        let results: Vec<_> = format.decoder().decode_reader(bytes).collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(GrammarError::Malformed { .. })));
    }

    /// Produces a header and `rows` data lines without ever holding more
    /// than one line.
    struct Generated {
        rows: usize,
        next: usize,
        line: Vec<u8>,
        offset: usize,
    }

    impl Read for Generated {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.offset >= self.line.len() {
                if self.next > self.rows {
                    return Ok(0);
                }
                self.line = if self.next == 0 {
                    b"ID;NAME\n".to_vec()
                } else {
                    format!("{};name-{}\n", self.next, self.next).into_bytes()
                };
                self.next += 1;
                self.offset = 0;
            }
            let n = buf.len().min(self.line.len() - self.offset);
            buf[..n].copy_from_slice(&self.line[self.offset..self.offset + n]);
            self.offset += n;
            Ok(n)
        }
    }

    #[test]
    fn test_streams_large_input() {
        let format = CsvFormat::builder()
            .columns([("id", "ID"), ("name", "NAME")])
            .delimiter(';')
            .build()
            .unwrap();
        let rows = 250_000;
        let source = Generated {
            rows,
            next: 0,
            line: Vec::new(),
            offset: 0,
        };

        let mut count = 0;
        let mut last = String::new();
        for record in format.decoder().decode_reader(source) {
            let record = record.unwrap();
            count += 1;
            last = record.get("name").unwrap().to_string();
        }

        assert_eq!(count, rows);
        assert_eq!(last, format!("name-{}", rows));
    }
}
