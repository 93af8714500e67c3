//! Pipelines connecting lazy row and record sequences to sinks and sources.
//!
//! # Example
//!
//! ```rust
//! use prelude_csv::{CsvFormat, StreamReader, StreamWriter};
//!
//! let format = CsvFormat::builder()
//!     .columns([("name", "NAME"), ("country", "COUNTRY")])
//!     .delimiter(';')
//!     .build()
//!     .unwrap();
//!
//! let sink = StreamWriter::new(Vec::new());
//! let written = format
//!     .for_output_to(&sink)
//!     .apply(vec![vec!["Ada", "UK"], vec!["Grace", "US"]])
//!     .unwrap();
//! assert_eq!(written, 3);
//!
//! let text = String::from_utf8(sink.into_inner()).unwrap();
//! let source = StreamReader::from_text(&text);
//! let names: Vec<String> = format
//!     .for_input_from(&source)
//!     .try_apply(|record| record.get("name").map(str::to_string))
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(names, vec!["Ada", "Grace"]);
//! ```

use crate::codec::{CsvField, Record, Records};
use crate::error::{PipelineError, PipelineResult};
use crate::format::CsvFormat;
use crate::io::{TextReader, TextWriter};
use crate::logs::{log_error, log_info, log_info_indent, log_success};
use std::fmt;

impl CsvFormat {
    /// Pipeline writing encoded rows to `sink`.
    pub fn for_output_to<'f, 'w, W: TextWriter>(&'f self, sink: &'w W) -> OutputPipeline<'f, 'w, W> {
        OutputPipeline { format: self, sink }
    }

    /// Pipeline decoding records from `source`.
    pub fn for_input_from<'f, 'r, S: TextReader>(&'f self, source: &'r S) -> InputPipeline<'f, 'r, S> {
        InputPipeline { format: self, source }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Writes rows to a sink, header first when columns are declared.
#[derive(Debug)]
pub struct OutputPipeline<'f, 'w, W> {
    format: &'f CsvFormat,
    sink: &'w W,
}

impl<W: TextWriter> OutputPipeline<'_, '_, W> {
    /// Encode and write every row; returns the number of lines written,
    /// header included.
    ///
    /// The sink is opened once and released on every exit path.
    pub fn apply<I>(&self, rows: I) -> PipelineResult<u64>
    where
        I: IntoIterator,
        I::Item: IntoIterator,
        <I::Item as IntoIterator>::Item: CsvField,
    {
        let target = self.sink.describe();
        log_info(format!("Writing CSV to {}", target));

        let encoder = self.format.encoder();
        let separator = self.format.record_separator();
        let settings = format!(
            "Delimiter {:?}, separator {}, {} columns",
            self.format.delimiter(),
            separator,
            self.format.columns().len()
        );
        log_info_indent(settings, 1);

        let result = self.sink.write(|sink| {
            for line in encoder.encode_many(rows) {
                sink.write_line(&line?, separator)?;
            }
            Ok::<_, PipelineError>(sink.lines_written())
        });

        match &result {
            Ok(lines) => log_success(format!("Wrote {} lines to {}", lines, target)),
            Err(e) => log_error(format!("Writing {} failed ({} layer): {}", target, e.layer(), e)),
        }
        result
    }
}

// =============================================================================
// Input
// =============================================================================

/// Reads records from a source and maps them through a transform.
#[derive(Debug)]
pub struct InputPipeline<'f, 'r, S> {
    format: &'f CsvFormat,
    source: &'r S,
}

impl<'r, S: TextReader> InputPipeline<'_, 'r, S> {
    /// Open the source and return a lazy, single-pass sequence of
    /// `transform(record)`.
    pub fn apply<T, F>(&self, transform: F) -> PipelineResult<MappedRecords<'r, F>>
    where
        F: FnMut(Record) -> T,
    {
        Ok(MappedRecords {
            records: self.open()?,
            transform,
            count: 0,
        })
    }

    /// Like [`InputPipeline::apply`] for transforms that can fail per record.
    ///
    /// A failing transform yields an error for that record only; iteration
    /// continues with the next one.
    pub fn try_apply<T, E, F>(&self, transform: F) -> PipelineResult<TryMappedRecords<'r, F>>
    where
        F: FnMut(Record) -> Result<T, E>,
        PipelineError: From<E>,
    {
        Ok(TryMappedRecords {
            records: self.open()?,
            transform,
        })
    }

    fn open(&self) -> PipelineResult<Records<'r>> {
        let source: &'r S = self.source;
        log_info(format!("Reading CSV from {}", source.describe()));

        let text = source.open_text().map_err(|e| {
            log_error(format!("Cannot open {}: {}", source.describe(), e));
            e
        })?;
        Ok(self.format.decoder().decode_reader(text))
    }
}

/// Sequence returned by [`InputPipeline::apply`].
pub struct MappedRecords<'r, F> {
    records: Records<'r>,
    transform: F,
    count: u64,
}

impl<'r, F> MappedRecords<'r, F> {
    /// Physical header, once the first record has been pulled.
    pub fn header(&self) -> Option<&[String]> {
        self.records.header()
    }
}

impl<T, F> Iterator for MappedRecords<'_, F>
where
    F: FnMut(Record) -> T,
{
    type Item = PipelineResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.records.next() {
            Some(Ok(record)) => {
                self.count += 1;
                Some(Ok((self.transform)(record)))
            }
            Some(Err(e)) => {
                log_error(format!("Decoding stopped after {} records: {}", self.count, e));
                Some(Err(e.into()))
            }
            None => None,
        }
    }
}

/// Sequence returned by [`InputPipeline::try_apply`].
pub struct TryMappedRecords<'r, F> {
    records: Records<'r>,
    transform: F,
}

// Transforms are usually closures, which have no Debug.
impl<F> fmt::Debug for MappedRecords<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRecords")
            .field("records", &self.records)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

impl<F> fmt::Debug for TryMappedRecords<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryMappedRecords")
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

impl<T, E, F> Iterator for TryMappedRecords<'_, F>
where
    F: FnMut(Record) -> Result<T, E>,
    PipelineError: From<E>,
{
    type Item = PipelineResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        Some((self.transform)(record).map_err(PipelineError::from))
    }
}
