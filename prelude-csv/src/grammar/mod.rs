//! Grammar engine boundary.
//!
//! The codec never quotes, escapes or splits fields itself. It selects a
//! delimiter, quote/escape characters and a [`QuoteMode`], and hands the
//! mechanics to a [`Grammar`]. [`CsvGrammar`] is the implementation backed
//! by the `csv` crate; any other engine (a hand-rolled RFC 4180 splitter, a
//! fixed-width dialect) can be plugged into [`crate::Encoder::with_grammar`]
//! and [`crate::Decoder::with_grammar`].

use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use std::io::Read;

use crate::error::{GrammarError, GrammarResult};
use crate::models::QuoteMode;

mod escaped;

/// Fields of one input record as split by the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFields {
    /// 1-based line where the record starts.
    pub line: u64,
    pub fields: Vec<String>,
}

/// Lazy stream of split records.
pub type FieldStream<'r> = Box<dyn Iterator<Item = GrammarResult<ParsedFields>> + 'r>;

/// Formats and splits delimited records.
pub trait Grammar {
    /// Join `fields` into one line, quoting and escaping as configured.
    /// The result carries no record separator.
    fn format(&self, fields: &[&str]) -> GrammarResult<String>;

    /// Split `source` into records, one per pull.
    fn split<'r>(&self, source: Box<dyn Read + 'r>) -> FieldStream<'r>;

    /// Whether the first record of a source is a header.
    fn expects_header(&self) -> bool;
}

impl<G: Grammar + ?Sized> Grammar for &G {
    fn format(&self, fields: &[&str]) -> GrammarResult<String> {
        (**self).format(fields)
    }

    fn split<'r>(&self, source: Box<dyn Read + 'r>) -> FieldStream<'r> {
        (**self).split(source)
    }

    fn expects_header(&self) -> bool {
        (**self).expects_header()
    }
}

// =============================================================================
// csv crate engine
// =============================================================================

/// [`Grammar`] backed by the `csv` crate.
///
/// Characters are stored as bytes; [`crate::CsvFormatBuilder::build`]
/// rejects anything that is not single-byte ASCII before one is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvGrammar {
    delimiter: u8,
    quote: Option<u8>,
    escape: Option<u8>,
    quote_mode: QuoteMode,
    trim: bool,
    header: bool,
}

impl CsvGrammar {
    pub(crate) fn new(delimiter: u8, quote: Option<u8>, escape: Option<u8>, quote_mode: QuoteMode) -> Self {
        Self {
            delimiter,
            quote,
            escape,
            quote_mode,
            trim: false,
            header: false,
        }
    }

    pub(crate) fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub(crate) fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Whether split fields are trimmed of surrounding whitespace.
    pub fn trims(&self) -> bool {
        self.trim
    }

    /// Escape character of the unquoted dialect, used when fields are never
    /// quoted but an escape character is configured.
    fn unquoted_escape(&self) -> Option<u8> {
        match self.escape {
            Some(escape) if self.quote.is_none() || self.quote_mode == QuoteMode::None => Some(escape),
            _ => None,
        }
    }

    fn quote_style(&self) -> QuoteStyle {
        if self.quote.is_none() {
            return QuoteStyle::Never;
        }

        match self.quote_mode {
            QuoteMode::All => QuoteStyle::Always,
            QuoteMode::None => QuoteStyle::Never,
            QuoteMode::Minimal => QuoteStyle::Necessary,
            QuoteMode::NonNumeric => QuoteStyle::NonNumeric,
        }
    }

    fn writer_builder(&self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        // one record per writer
        builder.buffer_capacity(256);
        // CRLF makes the engine quote embedded \r and \n; the terminator itself
        // is stripped again in `format`.
        builder
            .delimiter(self.delimiter)
            .quote_style(self.quote_style())
            .terminator(Terminator::CRLF)
            .has_headers(false)
            .flexible(true);

        if let Some(quote) = self.quote {
            builder.quote(quote);
        }
        if let Some(escape) = self.escape {
            builder.escape(escape).double_quote(false);
        }

        builder
    }

    fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .quoting(self.quote.is_some())
            .trim(if self.trim { Trim::All } else { Trim::None });

        if let Some(quote) = self.quote {
            builder.quote(quote);
        }
        if let Some(escape) = self.escape {
            builder.escape(Some(escape)).double_quote(false);
        }

        builder
    }
}

impl Grammar for CsvGrammar {
    fn format(&self, fields: &[&str]) -> GrammarResult<String> {
        if let Some(escape) = self.unquoted_escape() {
            return Ok(escaped::join(fields, self.delimiter, self.quote, escape));
        }

        let mut writer = self.writer_builder().from_writer(Vec::with_capacity(64));
        writer.write_record(fields)?;

        let mut bytes = writer
            .into_inner()
            .map_err(|e| GrammarError::Io(e.into_error()))?;
        if bytes.ends_with(b"\r\n") {
            bytes.truncate(bytes.len() - 2);
        }

        String::from_utf8(bytes).map_err(|e| GrammarError::Malformed {
            line: 0,
            message: e.to_string(),
        })
    }

    fn split<'r>(&self, source: Box<dyn Read + 'r>) -> FieldStream<'r> {
        if let Some(escape) = self.unquoted_escape() {
            return Box::new(escaped::EscapedFields::new(source, self.delimiter, escape, self.trim));
        }

        let reader = self.reader_builder().from_reader(source);

        Box::new(reader.into_records().map(|result| {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            Ok(ParsedFields {
                line,
                fields: record.iter().map(str::to_owned).collect(),
            })
        }))
    }

    fn expects_header(&self) -> bool {
        self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar(mode: QuoteMode) -> CsvGrammar {
        CsvGrammar::new(b',', Some(b'"'), None, mode)
    }

    fn split_all(grammar: &CsvGrammar, input: &'static str) -> Vec<Vec<String>> {
        grammar
            .split(Box::new(input.as_bytes()))
            .map(|r| r.unwrap().fields)
            .collect()
    }

    #[test]
    fn test_minimal_quoting() {
        let line = grammar(QuoteMode::Minimal).format(&["a,b", "c\"d", "e"]).unwrap();
        assert_eq!(line, r#""a,b","c""d",e"#);
    }

    #[test]
    fn test_embedded_newline_is_quoted() {
        let line = grammar(QuoteMode::Minimal).format(&["x\ny", "z"]).unwrap();
        assert_eq!(line, "\"x\ny\",z");
    }

    #[test]
    fn test_quote_modes() {
        assert_eq!(grammar(QuoteMode::All).format(&["1", "a"]).unwrap(), r#""1","a""#);
        assert_eq!(grammar(QuoteMode::NonNumeric).format(&["1", "a"]).unwrap(), r#"1,"a""#);
    }

    #[test]
    fn test_quote_mode_none_escapes_instead_of_quoting() {
        let g = CsvGrammar::new(b',', Some(b'"'), Some(b'\\'), QuoteMode::None);
        let line = g.format(&["x,y", "z"]).unwrap();
        assert_eq!(line, r"x\,y,z");

        let rows = split_all(&g, "x\\,y,z\n");
        assert_eq!(rows, vec![vec!["x,y", "z"]]);
    }

    #[test]
    fn test_long_field_outgrows_writer_buffer() {
        let long = "v".repeat(10_000);
        let line = grammar(QuoteMode::All).format(&[long.as_str(), "x"]).unwrap();
        assert_eq!(line.len(), 10_000 + 2 + 1 + 3);
        assert!(line.ends_with(",\"x\""));
    }

    #[test]
    fn test_no_quote_character_never_quotes() {
        let g = CsvGrammar::new(b';', None, None, QuoteMode::All);
        assert_eq!(g.format(&["a", "b"]).unwrap(), "a;b");
    }

    #[test]
    fn test_escape_character() {
        let g = CsvGrammar::new(b',', Some(b'"'), Some(b'\\'), QuoteMode::Minimal);
        let line = g.format(&["say \"hi\""]).unwrap();
        assert_eq!(line, r#""say \"hi\"""#);

        let fields = g
            .split(Box::new(line.as_bytes()))
            .next()
            .unwrap()
            .unwrap()
            .fields;
        assert_eq!(fields, vec!["say \"hi\""]);
    }

    #[test]
    fn test_split_is_quote_aware() {
        let g = grammar(QuoteMode::Minimal);
        let rows = split_all(&g, "\"a,b\",\"c\"\"d\",e\n\"x\ny\",z\n");
        assert_eq!(rows[0], vec!["a,b", "c\"d", "e"]);
        assert_eq!(rows[1], vec!["x\ny", "z"]);
    }

    #[test]
    fn test_split_tracks_lines_and_ragged_rows() {
        let g = grammar(QuoteMode::Minimal);
        let parsed: Vec<ParsedFields> = g
            .split(Box::new("a,b\n1\n2,3,4\n".as_bytes()))
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].line, 2);
        assert_eq!(parsed[1].fields, vec!["1"]);
        assert_eq!(parsed[2].fields, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_split_trims_when_enabled() {
        let g = grammar(QuoteMode::Minimal).with_trim(true);
        let rows = split_all(&g, "  x  , y\n");
        assert_eq!(rows[0], vec!["x", "y"]);
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let g = grammar(QuoteMode::Minimal);
        let bytes: &'static [u8] = &[b'a', b',', 0xff, b'\n'];
        let err = g.split(Box::new(bytes)).next().unwrap().unwrap_err();
        assert!(matches!(err, GrammarError::Malformed { .. }));
    }
}
