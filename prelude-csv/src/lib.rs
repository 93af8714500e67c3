//! # prelude-csv - Schema-aware CSV record codec
//!
//! Encodes rows of values into CSV lines and decodes CSV text back into
//! records addressable by logical column name, streaming in both directions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Rows     │────▶│   Encoder   │────▶│   Grammar   │────▶│ TextWriter  │
//! │ (any value) │     │ (schema)    │     │ (csv crate) │     │ (charset)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ TextReader  │────▶│   Grammar   │────▶│   Decoder   │────▶│   Record    │
//! │ (auto-enc)  │     │ (split)     │     │ (header idx)│     │ (by name)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use prelude_csv::{CsvFormat, QuoteMode};
//!
//! let format = CsvFormat::builder()
//!     .columns(["id", "label"])
//!     .quote_mode(QuoteMode::Minimal)
//!     .build()
//!     .unwrap();
//!
//! let lines: Vec<String> = format
//!     .encoder()
//!     .encode_many(vec![vec!["1", "a,b"]])
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(lines, vec!["id,label", "1,\"a,b\""]);
//!
//! let record = format.decoder().decode_str("label,id\nx,7\n").next().unwrap().unwrap();
//! assert_eq!(record.get("id").unwrap(), "7");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Columns, separators, quote modes
//! - [`format`] - Immutable format and its builder
//! - [`grammar`] - Field-level CSV grammar
//! - [`codec`] - Encoder, decoder, records
//! - [`io`] - Text sinks and sources, charsets
//! - [`pipeline`] - Sink and source pipelines
//! - [`config`] - JSON and environment settings
//! - [`logs`] - Log broadcasting

// Core modules
pub mod error;
pub mod models;

// Format and grammar
pub mod format;
pub mod grammar;

// Encoding and decoding
pub mod codec;

// Sinks, sources, pipelines
pub mod io;
pub mod pipeline;

// Settings
pub mod config;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    FormatError,
    FormatResult,
    GrammarError,
    GrammarResult,
    PipelineError,
    PipelineResult,
    ResolutionError,
    ResolutionResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Column, LineSeparator, QuoteMode};

// =============================================================================
// Re-exports - Format
// =============================================================================

pub use format::{CsvFormat, CsvFormatBuilder};
pub use grammar::{CsvGrammar, FieldStream, Grammar, ParsedFields};

// =============================================================================
// Re-exports - Codec
// =============================================================================

pub use codec::{
    CsvField,
    Decoder,
    EncodedLines,
    Encoder,
    HeaderIndex,
    Record,
    Records,
};

// =============================================================================
// Re-exports - IO
// =============================================================================

pub use io::{
    detect_encoding,
    encoding_for_label,
    DecodingReader,
    FileReader,
    FileWriter,
    LineSink,
    StreamReader,
    StreamWriter,
    TextReader,
    TextWriter,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{InputPipeline, MappedRecords, OutputPipeline, TryMappedRecords};

// =============================================================================
// Re-exports - Settings and logs
// =============================================================================

pub use config::FormatSettings;
pub use logs::{LogCollector, LogEntry, LogLevel, LOG_BROADCASTER};
