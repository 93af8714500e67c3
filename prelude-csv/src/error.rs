//! Error types for the CSV codec.
//!
//! Errors are split by the layer that raised them:
//!
//! - [`FormatError`] - invalid format configuration or settings
//! - [`GrammarError`] - the grammar engine could not format or split a record
//! - [`ResolutionError`] - a field lookup on a decoded record failed
//! - [`PipelineError`] - top-level error of an input/output pipeline
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors raised while building a [`crate::CsvFormat`] or loading settings.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Two of delimiter, quote and escape are the same character.
    #[error("{first} and {second} must differ, both are {ch:?}")]
    CharacterCollision {
        first: &'static str,
        second: &'static str,
        ch: char,
    },

    /// The grammar engine only handles single-byte characters.
    #[error("{role} must be a single-byte ASCII character, got {ch:?}")]
    NonAscii { role: &'static str, ch: char },

    /// Line breaks are reserved for record separation.
    #[error("{role} cannot be a line break")]
    LineBreak { role: &'static str },

    /// Unquoted output needs an escape character to protect special characters.
    #[error("quote mode none requires an escape character")]
    MissingEscape,

    /// A settings value could not be interpreted.
    #[error("Invalid setting '{key}': {message}")]
    InvalidSetting { key: String, message: String },

    /// Settings file is not valid JSON.
    #[error("Settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings file could not be read.
    #[error("Settings IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormatError {
    pub fn invalid_setting(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Grammar Errors
// =============================================================================

/// Errors from the grammar engine.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// Input could not be split into fields.
    #[error("Malformed record at line {line}: {message}")]
    Malformed { line: u64, message: String },

    /// Underlying reader or writer failed.
    #[error("Grammar IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for GrammarError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => GrammarError::Io(e),
            _ => GrammarError::Malformed { line, message },
        }
    }
}

// =============================================================================
// Resolution Errors
// =============================================================================

/// Field lookup errors on a single decoded record.
///
/// These never abort a decode sequence; they only concern the access that
/// raised them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Logical column is not declared or its physical name is not in the header.
    #[error("Column not found: {0}")]
    NotFound(String),

    /// Column is mapped but the record is too short to hold it.
    #[error("Column '{column}' maps to position {position} but line {line} has {width} fields")]
    MissingField {
        column: String,
        position: usize,
        width: usize,
        line: u64,
    },

    /// Positional access past the end of the record.
    #[error("Position {position} out of range, record has {width} fields")]
    OutOfRange { position: usize, width: usize },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level error of [`crate::OutputPipeline`] and [`crate::InputPipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Grammar engine error.
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    /// Sink or source error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Field resolution error raised inside a pipeline callback.
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),
}

impl PipelineError {
    /// Name of the layer that failed.
    pub fn layer(&self) -> &'static str {
        match self {
            PipelineError::Format(_) => "configuration",
            PipelineError::Grammar(GrammarError::Io(_)) | PipelineError::Io(_) => "io",
            PipelineError::Grammar(_) => "grammar",
            PipelineError::Resolution(_) => "resolution",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for grammar operations.
pub type GrammarResult<T> = Result<T, GrammarError>;

/// Result type for record field lookups.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let format_err = FormatError::CharacterCollision {
            first: "delimiter",
            second: "quote",
            ch: ';',
        };
        let pipeline_err: PipelineError = format_err.into();
        assert_eq!(pipeline_err.layer(), "configuration");
        assert!(pipeline_err.to_string().contains("delimiter"));

        let resolution_err = ResolutionError::NotFound("country".into());
        let pipeline_err: PipelineError = resolution_err.into();
        assert_eq!(pipeline_err.layer(), "resolution");
        assert!(pipeline_err.to_string().contains("country"));
    }

    #[test]
    fn test_grammar_io_is_io_layer() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let pipeline_err: PipelineError = GrammarError::Io(io).into();
        assert_eq!(pipeline_err.layer(), "io");

        let malformed = GrammarError::Malformed {
            line: 3,
            message: "bad".into(),
        };
        let pipeline_err: PipelineError = malformed.into();
        assert_eq!(pipeline_err.layer(), "grammar");
        assert!(pipeline_err.to_string().contains("line 3"));
    }

    #[test]
    fn test_missing_field_format() {
        let err = ResolutionError::MissingField {
            column: "country".into(),
            position: 2,
            width: 1,
            line: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("country"));
        assert!(msg.contains("line 4"));
    }
}
