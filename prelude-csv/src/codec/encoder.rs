//! Record encoder: rows to delimited text lines.

use std::borrow::Cow;

use super::field::CsvField;
use crate::error::GrammarResult;
use crate::format::CsvFormat;
use crate::grammar::{CsvGrammar, Grammar};
use crate::models::Column;

/// Encodes rows with a [`CsvFormat`].
///
/// Positional: values are written in the order given, no arity check
/// against the declared columns.
#[derive(Debug, Clone)]
pub struct Encoder<'f, G = &'f CsvGrammar> {
    format: &'f CsvFormat,
    grammar: G,
    append_separator: bool,
}

impl<'f> Encoder<'f> {
    /// Encoder using the format's export grammar.
    pub fn new(format: &'f CsvFormat) -> Self {
        Self::with_grammar(format, format.export_grammar())
    }
}

impl<'f, G: Grammar> Encoder<'f, G> {
    /// Encoder delegating quoting and joining to `grammar`.
    pub fn with_grammar(format: &'f CsvFormat, grammar: G) -> Self {
        Self {
            format,
            grammar,
            append_separator: false,
        }
    }

    /// Append the record separator to every produced line.
    ///
    /// Off by default: line-oriented sinks add their own separator.
    pub fn append_separator(mut self, append: bool) -> Self {
        self.append_separator = append;
        self
    }

    pub fn format(&self) -> &'f CsvFormat {
        self.format
    }

    /// Encode one row.
    pub fn encode<R>(&self, row: R) -> GrammarResult<String>
    where
        R: IntoIterator,
        R::Item: CsvField,
    {
        let values: Vec<R::Item> = row.into_iter().collect();
        let fields: Vec<Cow<'_, str>> = values.iter().map(|v| self.prepare(v)).collect();
        self.finish(&fields)
    }

    /// Encode a row addressed by logical column name.
    ///
    /// `lookup` is called once per declared column, in column order.
    pub fn encode_named<F, V>(&self, mut lookup: F) -> GrammarResult<String>
    where
        F: FnMut(&str) -> V,
        V: CsvField,
    {
        let values: Vec<V> = self
            .format
            .columns()
            .iter()
            .map(|column| lookup(column.name()))
            .collect();
        self.encode(values)
    }

    /// Header line built from the physical column names, `None` without columns.
    pub fn header_line(&self) -> Option<GrammarResult<String>> {
        if !self.format.has_header() {
            return None;
        }
        Some(self.encode(self.format.columns().iter().map(Column::physical_name)))
    }

    /// Lazily encode `rows`, preceded by the header line when columns are declared.
    ///
    /// The header follows the [`Encoder::append_separator`] toggle like any
    /// data line: with the toggle off (the default) neither carries a record
    /// separator and the sink must add one after each line, as
    /// [`crate::OutputPipeline`] does. With the toggle on, the header ends
    /// with exactly one separator.
    pub fn encode_many<I>(&self, rows: I) -> EncodedLines<'_, 'f, G, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: IntoIterator,
        <I::Item as IntoIterator>::Item: CsvField,
    {
        EncodedLines {
            encoder: self,
            rows: rows.into_iter(),
            header_pending: true,
        }
    }

    fn prepare<'v, V: CsvField>(&self, value: &'v V) -> Cow<'v, str> {
        let field = value.to_field().unwrap_or(Cow::Borrowed(""));
        if !self.format.is_auto_trimmed() {
            return field;
        }

        match field {
            Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
            Cow::Owned(s) => Cow::Owned(s.trim().to_owned()),
        }
    }

    fn finish(&self, fields: &[Cow<'_, str>]) -> GrammarResult<String> {
        let refs: Vec<&str> = fields.iter().map(|f| f.as_ref()).collect();
        let mut line = self.grammar.format(&refs)?;
        if self.append_separator {
            line.push_str(self.format.record_separator().value());
        }
        Ok(line)
    }
}

/// Lazy sequence of encoded lines returned by [`Encoder::encode_many`].
#[derive(Debug)]
pub struct EncodedLines<'e, 'f, G, I> {
    encoder: &'e Encoder<'f, G>,
    rows: I,
    header_pending: bool,
}

impl<G, I> Iterator for EncodedLines<'_, '_, G, I>
where
    G: Grammar,
    I: Iterator,
    I::Item: IntoIterator,
    <I::Item as IntoIterator>::Item: CsvField,
{
    type Item = GrammarResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.header_pending {
            self.header_pending = false;
            if let Some(header) = self.encoder.header_line() {
                return Some(header);
            }
        }

        let row = self.rows.next()?;
        Some(self.encoder.encode(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let extra = usize::from(self.header_pending && self.encoder.format.has_header());
        let (low, high) = self.rows.size_hint();
        (
            low.saturating_add(extra),
            high.and_then(|h| h.checked_add(extra)),
        )
    }
}
