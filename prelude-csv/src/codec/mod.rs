//! Record codec.
//!
//! - `field`: conversion of row values into field text
//! - `encoder`: rows to lines, header first when columns are declared
//! - `decoder`: text to [`Record`]s, header names resolved per input
//! - `record`: decoded records and the header index
//!
//! ## Usage Flow
//!
//! ```text
//! rows ─▶ Encoder::encode_many ─▶ lines ─▶ sink
//! source ─▶ Decoder::decode_reader ─▶ Records ─▶ record.get("logicalName")
//! ```

pub mod decoder;
pub mod encoder;
pub mod field;
pub mod record;

pub use decoder::{Decoder, Records};
pub use encoder::{EncodedLines, Encoder};
pub use field::CsvField;
pub use record::{HeaderIndex, Record};

use crate::format::CsvFormat;

impl CsvFormat {
    /// Encoder over the export grammar, record separator not appended.
    pub fn encoder(&self) -> Encoder<'_> {
        Encoder::new(self)
    }

    /// Decoder over the import grammar.
    pub fn decoder(&self) -> Decoder<'_> {
        Decoder::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineSeparator, QuoteMode};

    fn encode_text(format: &CsvFormat, rows: Vec<Vec<&str>>) -> String {
        let encoder = format.encoder().append_separator(true);
        encoder.encode_many(rows).map(|l| l.unwrap()).collect()
    }

    #[test]
    fn test_round_trip_by_logical_name() {
        let format = CsvFormat::builder()
            .columns([("id", "ID"), ("title", "TITLE"), ("note", "NOTE")])
            .delimiter(';')
            .record_separator(LineSeparator::CrLf)
            .build()
            .unwrap();
        let rows = vec![
            vec!["1", "Plain", "nothing special"],
            vec!["2", "Semi;colon", "say \"hi\""],
            vec!["3", "", "two\nlines"],
        ];

        let text = encode_text(&format, rows.clone());
        let decoded: Vec<Record> = format.decoder().decode_str(&text).map(|r| r.unwrap()).collect();

        assert_eq!(decoded.len(), rows.len());
        for (record, row) in decoded.iter().zip(&rows) {
            assert_eq!(record.get("id").unwrap(), row[0]);
            assert_eq!(record.get("title").unwrap(), row[1]);
            assert_eq!(record.get("note").unwrap(), row[2]);
        }
    }

    #[test]
    fn test_quoting_round_trip() {
        let format = CsvFormat::builder().build().unwrap();
        let line = format.encoder().encode(["a,b", "c\"d", "e"]).unwrap();
        assert_eq!(line, r#""a,b","c""d",e"#);

        let record = format.decoder().decode_str(&line).next().unwrap().unwrap();
        assert_eq!(record.fields(), &["a,b", "c\"d", "e"]);
    }

    #[test]
    fn test_round_trip_all_quote_modes() {
        for mode in [QuoteMode::All, QuoteMode::Minimal, QuoteMode::NonNumeric] {
            let format = CsvFormat::builder()
                .columns(["a", "b"])
                .quote_mode(mode)
                .build()
                .unwrap();
            let text = encode_text(&format, vec![vec!["x,y", "12"]]);
            let record = format.decoder().decode_str(&text).next().unwrap().unwrap();
            assert_eq!(record.get("a").unwrap(), "x,y", "mode {}", mode);
            assert_eq!(record.get("b").unwrap(), "12", "mode {}", mode);
        }
    }

    #[test]
    fn test_round_trip_unquoted_with_escape() {
        let format = CsvFormat::builder()
            .columns(["a", "b"])
            .quote_mode(QuoteMode::None)
            .escape(Some('\\'))
            .build()
            .unwrap();
        let text = encode_text(&format, vec![vec!["x,y", "z"], vec!["two\nlines", "back\\slash"]]);
        assert_eq!(text, "a,b\nx\\,y,z\ntwo\\nlines,back\\\\slash\n");

        let records: Vec<Record> = format.decoder().decode_str(&text).map(|r| r.unwrap()).collect();
        assert_eq!(records[0].get("a").unwrap(), "x,y");
        assert_eq!(records[0].get("b").unwrap(), "z");
        assert_eq!(records[0].len(), 2);
        assert_eq!(records[1].get("a").unwrap(), "two\nlines");
        assert_eq!(records[1].get("b").unwrap(), "back\\slash");
    }

    #[test]
    fn test_auto_trim_both_ends() {
        let format = CsvFormat::builder().auto_trim(true).build().unwrap();
        let line = format.encoder().encode(["  x  "]).unwrap();
        assert_eq!(line, "x");

        let untrimmed = CsvFormat::builder().build().unwrap();
        let padded = untrimmed.encoder().encode(["  x  "]).unwrap();
        let record = format.decoder().decode_str(&padded).next().unwrap().unwrap();
        assert_eq!(record.get_at(0).unwrap(), "x");
    }
}
