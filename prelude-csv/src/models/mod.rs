//! Domain models shared by the format, codec and pipeline layers.
//!
//! - [`Column`] - Logical/physical name pair of a schema column
//! - [`LineSeparator`] - Record separator appended after each line
//! - [`QuoteMode`] - When fields get wrapped in quote characters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Column
// =============================================================================

/// A column of the schema.
///
/// The logical name is what callers use to address a field; the physical
/// name is what appears literally in a file header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    physical: Option<String>,
}

impl Column {
    /// Column whose physical name equals its logical name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            physical: None,
        }
    }

    /// Column with a distinct header name.
    pub fn with_physical(name: impl Into<String>, physical: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            physical: Some(physical.into()),
        }
    }

    /// Logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header name, defaults to the logical name.
    pub fn physical_name(&self) -> &str {
        self.physical.as_deref().unwrap_or(&self.name)
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::new(name)
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::new(name)
    }
}

impl From<(&str, &str)> for Column {
    fn from((name, physical): (&str, &str)) -> Self {
        Column::with_physical(name, physical)
    }
}

/// Parses `name` or `name=PHYSICAL`.
impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, physical) = match s.split_once('=') {
            Some((name, physical)) => (name.trim(), Some(physical.trim())),
            None => (s.trim(), None),
        };

        if name.is_empty() {
            return Err(format!("empty column name in '{}'", s));
        }

        Ok(match physical {
            Some(p) if !p.is_empty() => Column::with_physical(name, p),
            _ => Column::new(name),
        })
    }
}

// =============================================================================
// Line Separator
// =============================================================================

/// Character sequence terminating each output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSeparator {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
    /// Nothing; records are concatenated.
    None,
}

impl LineSeparator {
    pub fn value(&self) -> &'static str {
        match self {
            LineSeparator::Lf => "\n",
            LineSeparator::CrLf => "\r\n",
            LineSeparator::None => "",
        }
    }
}

impl fmt::Display for LineSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineSeparator::Lf => "lf",
            LineSeparator::CrLf => "crlf",
            LineSeparator::None => "none",
        })
    }
}

impl FromStr for LineSeparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lf" | "\\n" => Ok(LineSeparator::Lf),
            "crlf" | "\\r\\n" => Ok(LineSeparator::CrLf),
            "none" | "" => Ok(LineSeparator::None),
            other => Err(format!("unknown record separator '{}' (expected lf, crlf or none)", other)),
        }
    }
}

// =============================================================================
// Quote Mode
// =============================================================================

/// Policy deciding which fields are quoted on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteMode {
    /// Quote every field.
    All,
    /// Never quote.
    None,
    /// Quote only fields containing the delimiter, quote or a line break.
    #[default]
    Minimal,
    /// Quote every field that is not a number.
    NonNumeric,
}

impl fmt::Display for QuoteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuoteMode::All => "all",
            QuoteMode::None => "none",
            QuoteMode::Minimal => "minimal",
            QuoteMode::NonNumeric => "non-numeric",
        })
    }
}

impl FromStr for QuoteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "all" => Ok(QuoteMode::All),
            "none" => Ok(QuoteMode::None),
            "minimal" => Ok(QuoteMode::Minimal),
            "non-numeric" | "nonnumeric" => Ok(QuoteMode::NonNumeric),
            other => Err(format!(
                "unknown quote mode '{}' (expected all, none, minimal or non-numeric)",
                other
            )),
        }
    }
}
