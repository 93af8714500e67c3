//! Serializable format settings.
//!
//! [`FormatSettings`] mirrors every [`CsvFormat`] field in a form that can be
//! stored as JSON and overridden from the environment:
//!
//! | Variable                        | Example          |
//! |---------------------------------|------------------|
//! | `PRELUDE_CSV_DELIMITER`         | `;`, `\t`, `tab` |
//! | `PRELUDE_CSV_RECORD_SEPARATOR`  | `lf`, `crlf`     |
//! | `PRELUDE_CSV_QUOTE`             | `"`, `none`      |
//! | `PRELUDE_CSV_ESCAPE`            | `\`, `none`      |
//! | `PRELUDE_CSV_QUOTE_MODE`        | `non-numeric`    |
//! | `PRELUDE_CSV_AUTO_TRIM`         | `true`           |
//! | `PRELUDE_CSV_COLUMNS`           | `id,name=NAME`   |

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{FormatError, FormatResult};
use crate::format::CsvFormat;
use crate::models::{Column, LineSeparator, QuoteMode};

pub const ENV_DELIMITER: &str = "PRELUDE_CSV_DELIMITER";
pub const ENV_RECORD_SEPARATOR: &str = "PRELUDE_CSV_RECORD_SEPARATOR";
pub const ENV_QUOTE: &str = "PRELUDE_CSV_QUOTE";
pub const ENV_ESCAPE: &str = "PRELUDE_CSV_ESCAPE";
pub const ENV_QUOTE_MODE: &str = "PRELUDE_CSV_QUOTE_MODE";
pub const ENV_AUTO_TRIM: &str = "PRELUDE_CSV_AUTO_TRIM";
pub const ENV_COLUMNS: &str = "PRELUDE_CSV_COLUMNS";

/// Plain-data form of a [`CsvFormat`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatSettings {
    pub columns: Vec<Column>,
    pub delimiter: char,
    pub record_separator: LineSeparator,
    pub quote: Option<char>,
    pub escape: Option<char>,
    pub quote_mode: QuoteMode,
    pub auto_trim: bool,
}

impl Default for FormatSettings {
    fn default() -> Self {
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
}

impl FormatSettings {
    /// Parse settings from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> FormatResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> FormatResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> FormatResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Override fields from `PRELUDE_CSV_*` variables, reading `.env` first.
    pub fn apply_env(self) -> FormatResult<Self> {
        let _ = dotenvy::dotenv();
        self.apply_vars(|key| env::var(key).ok())
    }

    /// Override fields from any key/value lookup.
    pub fn apply_vars<F>(mut self, lookup: F) -> FormatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DELIMITER) {
            self.delimiter = parse_char(ENV_DELIMITER, &value)?;
        }
        if let Some(value) = lookup(ENV_RECORD_SEPARATOR) {
            self.record_separator = value
                .parse()
                .map_err(|e: String| FormatError::invalid_setting(ENV_RECORD_SEPARATOR, e))?;
        }
        if let Some(value) = lookup(ENV_QUOTE) {
            self.quote = parse_optional_char(ENV_QUOTE, &value)?;
        }
        if let Some(value) = lookup(ENV_ESCAPE) {
            self.escape = parse_optional_char(ENV_ESCAPE, &value)?;
        }
        if let Some(value) = lookup(ENV_QUOTE_MODE) {
            self.quote_mode = value
                .parse()
                .map_err(|e: String| FormatError::invalid_setting(ENV_QUOTE_MODE, e))?;
        }
        if let Some(value) = lookup(ENV_AUTO_TRIM) {
            self.auto_trim = parse_bool(ENV_AUTO_TRIM, &value)?;
        }
        if let Some(value) = lookup(ENV_COLUMNS) {
            self.columns = parse_columns(ENV_COLUMNS, &value)?;
        }
        Ok(self)
    }

    /// Validate and build the format.
    pub fn build(&self) -> FormatResult<CsvFormat> {
        CsvFormat::builder()
            .columns(self.columns.iter().cloned())
            .delimiter(self.delimiter)
            .record_separator(self.record_separator)
            .quote(self.quote)
            .escape(self.escape)
            .quote_mode(self.quote_mode)
            .auto_trim(self.auto_trim)
            .build()
    }
}

impl From<&CsvFormat> for FormatSettings {
    fn from(format: &CsvFormat) -> Self {
        Self {
            columns: format.columns().to_vec(),
            delimiter: format.delimiter(),
            record_separator: format.record_separator(),
            quote: format.quote(),
            escape: format.escape(),
            quote_mode: format.quote_mode(),
            auto_trim: format.is_auto_trimmed(),
        }
    }
}

// =============================================================================
// Value parsing
// =============================================================================

/// Parse a single character, accepting `\t` and `tab` for tabulation.
pub fn parse_char(key: &str, value: &str) -> FormatResult<char> {
    match value {
        "\\t" | "tab" => return Ok('\t'),
        "space" => return Ok(' '),
        _ => {}
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(FormatError::invalid_setting(
            key,
            format!("expected a single character, got '{}'", value),
        )),
    }
}

/// Like [`parse_char`], with `none` or an empty value meaning absent.
pub fn parse_optional_char(key: &str, value: &str) -> FormatResult<Option<char>> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_char(key, value).map(Some)
}

fn parse_bool(key: &str, value: &str) -> FormatResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(FormatError::invalid_setting(
            key,
            format!("expected a boolean, got '{}'", other),
        )),
    }
}

/// Parse `name` or `name=PHYSICAL` entries separated by commas.
pub fn parse_columns(key: &str, value: &str) -> FormatResult<Vec<Column>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<Column>()
                .map_err(|e| FormatError::invalid_setting(key, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_builder() {
        let format = FormatSettings::default().build().unwrap();
        let defaults = CsvFormat::default();
        assert_eq!(FormatSettings::from(&format), FormatSettings::from(&defaults));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = FormatSettings::from_json(
            r#"{"delimiter": ";", "recordSeparator": "crlf", "quoteMode": "non-numeric",
                "columns": [{"name": "id"}, {"name": "name", "physical": "NAME"}]}"#,
        )
        .unwrap();

        assert_eq!(settings.delimiter, ';');
        assert_eq!(settings.record_separator, LineSeparator::CrLf);
        assert_eq!(settings.quote_mode, QuoteMode::NonNumeric);
        assert_eq!(settings.quote, Some('"'));
        assert_eq!(settings.columns[1].physical_name(), "NAME");
    }

    #[test]
    fn test_bad_json_is_format_error() {
        let err = FormatSettings::from_json("{\"delimiter\": 12}").unwrap_err();
        assert!(matches!(err, FormatError::Json(_)));
    }

    #[test]
    fn test_load_file_and_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("format.json");

        let format = CsvFormat::builder()
            .columns([("id", "ID")])
            .delimiter('\t')
            .escape(Some('\\'))
            .auto_trim(true)
            .build()
            .unwrap();
        let settings = FormatSettings::from(&format);
        fs::write(&path, settings.to_json().unwrap()).unwrap();

        let loaded = FormatSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.build().unwrap().escape(), Some('\\'));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FormatSettings::load("/nonexistent/prelude-csv/format.json").unwrap_err();
        assert!(matches!(err, FormatError::Io(_)));
    }

    #[test]
    fn test_vars_override() {
        let settings = FormatSettings::default()
            .apply_vars(vars(&[
                (ENV_DELIMITER, "tab"),
                (ENV_QUOTE, "none"),
                (ENV_AUTO_TRIM, "yes"),
                (ENV_COLUMNS, "id, name=NAME"),
            ]))
            .unwrap();

        assert_eq!(settings.delimiter, '\t');
        assert_eq!(settings.quote, None);
        assert!(settings.auto_trim);
        assert_eq!(settings.columns, vec![Column::new("id"), Column::with_physical("name", "NAME")]);
    }

    #[test]
    fn test_invalid_var_names_key() {
        let err = FormatSettings::default()
            .apply_vars(vars(&[(ENV_DELIMITER, ";;")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_DELIMITER));

        let err = FormatSettings::default()
            .apply_vars(vars(&[(ENV_QUOTE_MODE, "sometimes")]))
            .unwrap_err();
        assert!(matches!(err, FormatError::InvalidSetting { .. }));
    }

    #[test]
    fn test_build_validates() {
        let settings = FormatSettings {
            delimiter: '"',
            ..FormatSettings::default()
        };
        assert!(matches!(
            settings.build().unwrap_err(),
            FormatError::CharacterCollision { .. }
        ));
    }
}
