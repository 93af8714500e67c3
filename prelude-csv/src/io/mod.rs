//! Text sinks and sources.
//!
//! - [`TextWriter`]: append-only line output ([`FileWriter`], [`StreamWriter`])
//! - [`TextReader`]: forward-only text input ([`FileReader`], [`StreamReader`])
//! - [`charset`]: encoding detection and transcoding

pub mod charset;
pub mod reader;
pub mod writer;

pub use charset::{detect_encoding, encoding_for_label, DecodingReader};
pub use reader::{FileReader, StreamReader, TextReader};
pub use writer::{FileWriter, LineSink, StreamWriter, TextWriter};
