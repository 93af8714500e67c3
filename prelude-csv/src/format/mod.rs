//! Immutable CSV format configuration.
//!
//! A [`CsvFormat`] is built once through [`CsvFormatBuilder`] and shared by
//! every encode and decode operation. Building derives two grammars:
//!
//! - the export grammar never expects a header; the encoder writes fields
//!   in declared column order
//! - the import grammar expects exactly one header record when columns are
//!   declared and resolves fields by header name, in whatever order they appear
//!
//! # Example
//!
//! ```rust
//! use prelude_csv::{Column, CsvFormat, LineSeparator};
//!
//! let format = CsvFormat::builder()
//!     .columns([
//!         Column::with_physical("firstName", "FIRST_NAME"),
//!         Column::with_physical("lastName", "LAST_NAME"),
//!     ])
//!     .delimiter(';')
//!     .record_separator(LineSeparator::CrLf)
//!     .build()
//!     .unwrap();
//!
//! let line = format.encoder().encode(["Ada", "Lovelace"]).unwrap();
//! assert_eq!(line, "Ada;Lovelace");
//! ```

use crate::error::{FormatError, FormatResult};
use crate::grammar::CsvGrammar;
use crate::models::{Column, LineSeparator, QuoteMode};

/// Delimiter, quoting and schema shared by encoder and decoder.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    columns: Vec<Column>,
    delimiter: char,
    record_separator: LineSeparator,
    quote: Option<char>,
    escape: Option<char>,
    quote_mode: QuoteMode,
    auto_trim: bool,
    export_grammar: CsvGrammar,
    import_grammar: CsvGrammar,
}

impl CsvFormat {
    /// Builder with default settings.
    pub fn builder() -> CsvFormatBuilder {
        CsvFormatBuilder::new()
    }

    /// Builder initialized from every field of `prototype`.
    ///
    /// The prototype is not modified and stays usable.
    pub fn builder_from(prototype: &CsvFormat) -> CsvFormatBuilder {
        CsvFormatBuilder {
            columns: prototype.columns.clone(),
            delimiter: prototype.delimiter,
            record_separator: prototype.record_separator,
            quote: prototype.quote,
            escape: prototype.escape,
            quote_mode: prototype.quote_mode,
            auto_trim: prototype.auto_trim,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Whether a header is written on export and consumed on import.
    pub fn has_header(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn record_separator(&self) -> LineSeparator {
        self.record_separator
    }

    pub fn quote(&self) -> Option<char> {
        self.quote
    }

    pub fn escape(&self) -> Option<char> {
        self.escape
    }

    pub fn quote_mode(&self) -> QuoteMode {
        self.quote_mode
    }

    pub fn is_auto_trimmed(&self) -> bool {
        self.auto_trim
    }

    pub fn export_grammar(&self) -> &CsvGrammar {
        &self.export_grammar
    }

    pub fn import_grammar(&self) -> &CsvGrammar {
        &self.import_grammar
    }
}

impl Default for CsvFormat {
    fn default() -> Self {
        let builder = CsvFormatBuilder::new();
        let grammar = CsvGrammar::new(b',', Some(b'"'), None, QuoteMode::Minimal);
        Self {
            columns: builder.columns,
            delimiter: builder.delimiter,
            record_separator: builder.record_separator,
            quote: builder.quote,
            escape: builder.escape,
            quote_mode: builder.quote_mode,
            auto_trim: builder.auto_trim,
            export_grammar: grammar.clone(),
            import_grammar: grammar,
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Mutable builder producing an immutable [`CsvFormat`].
#[derive(Debug, Clone)]
pub struct CsvFormatBuilder {
    columns: Vec<Column>,
    delimiter: char,
    record_separator: LineSeparator,
    quote: Option<char>,
    escape: Option<char>,
    quote_mode: QuoteMode,
    auto_trim: bool,
}

impl CsvFormatBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            delimiter: ',',
            record_separator: LineSeparator::Lf,
            quote: Some('"'),
            escape: None,
            quote_mode: QuoteMode::Minimal,
            auto_trim: false,
        }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn record_separator(mut self, separator: LineSeparator) -> Self {
        self.record_separator = separator;
        self
    }

    /// Quote character, `None` disables quoting altogether.
    pub fn quote(mut self, quote: Option<char>) -> Self {
        self.quote = quote;
        self
    }

    /// Escape character used inside quoted fields instead of doubling quotes.
    pub fn escape(mut self, escape: Option<char>) -> Self {
        self.escape = escape;
        self
    }

    pub fn quote_mode(mut self, quote_mode: QuoteMode) -> Self {
        self.quote_mode = quote_mode;
        self
    }

    pub fn auto_trim(mut self, auto_trim: bool) -> Self {
        self.auto_trim = auto_trim;
        self
    }

    /// Replace the whole schema. An empty schema disables headers.
    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the characters and derive the export and import grammars.
    pub fn build(self) -> FormatResult<CsvFormat> {
        let delimiter = ascii_byte("delimiter", self.delimiter)?;
        let quote = self.quote.map(|c| ascii_byte("quote", c)).transpose()?;
        let escape = self.escape.map(|c| ascii_byte("escape", c)).transpose()?;

        let named = [
            ("delimiter", Some(self.delimiter)),
            ("quote", self.quote),
            ("escape", self.escape),
        ];
        for (i, &(first, a)) in named.iter().enumerate() {
            for &(second, b) in &named[i + 1..] {
                if let (Some(a), Some(b)) = (a, b) {
                    if a == b {
                        return Err(FormatError::CharacterCollision {
                            first,
                            second,
                            ch: a,
                        });
                    }
                }
            }
        }

        if self.quote_mode == QuoteMode::None && escape.is_none() {
            return Err(FormatError::MissingEscape);
        }

        let export_grammar = CsvGrammar::new(delimiter, quote, escape, self.quote_mode);
        let import_grammar = export_grammar
            .clone()
            .with_header(!self.columns.is_empty())
            .with_trim(self.auto_trim);

        Ok(CsvFormat {
            columns: self.columns,
            delimiter: self.delimiter,
            record_separator: self.record_separator,
            quote: self.quote,
            escape: self.escape,
            quote_mode: self.quote_mode,
            auto_trim: self.auto_trim,
            export_grammar,
            import_grammar,
        })
    }
}

impl Default for CsvFormatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn ascii_byte(role: &'static str, ch: char) -> FormatResult<u8> {
    if ch == '\r' || ch == '\n' {
        return Err(FormatError::LineBreak { role });
    }
    if !ch.is_ascii() {
        return Err(FormatError::NonAscii { role, ch });
    }
    Ok(ch as u8)
}
