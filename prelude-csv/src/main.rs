//! prelude-csv CLI - Encode, decode and convert CSV files
//!
//! # Commands
//!
//! ```bash
//! prelude-csv encode rows.jsonl -c id,name=NAME -o out.csv   # JSON lines -> CSV
//! prelude-csv decode in.csv -c id,name=NAME                   # CSV -> JSON lines
//! prelude-csv convert in.csv -d ';' --to-delimiter ','        # CSV -> CSV
//! prelude-csv config --config format.json                     # Effective settings
//! ```
//!
//! Format settings are taken, in increasing priority, from the defaults, the
//! `--config` JSON file, `PRELUDE_CSV_*` variables (`.env` included) and the
//! command-line flags.

use clap::{Args, Parser, Subcommand};
use encoding_rs::{Encoding, UTF_8};
use prelude_csv::config::{parse_char, parse_columns, parse_optional_char};
use prelude_csv::logs::{log_error, log_info, log_warning, LogCollector, LogEntry, LogLevel};
use prelude_csv::{
    encoding_for_label, CsvFormat, FileReader, FileWriter, FormatError, FormatSettings,
    LineSeparator, PipelineError, QuoteMode, Record, ResolutionError, StreamReader, StreamWriter,
    TextReader, TextWriter, LOG_BROADCASTER,
};
use serde_json::Value;
use std::error::Error;
use std::io::{self, Read, StdinLock, StdoutLock, Write};
use std::path::{Path, PathBuf};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "prelude-csv")]
#[command(about = "Schema-aware CSV encoder and decoder", long_about = None)]
struct Cli {
    /// Do not echo progress logs to stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit progress logs to stderr as JSON lines instead of text
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode JSON lines (arrays or objects) as CSV
    Encode {
        /// Input JSON lines file (default: stdin)
        input: Option<PathBuf>,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        charsets: CharsetArgs,
    },

    /// Decode CSV into JSON lines, one record per line
    Decode {
        /// Input CSV file (default: stdin)
        input: Option<PathBuf>,

        /// Output JSON lines file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        charsets: CharsetArgs,
    },

    /// Re-encode CSV from one format into another
    Convert {
        /// Input CSV file (default: stdin)
        input: Option<PathBuf>,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        charsets: CharsetArgs,
    },

    /// Print the effective format settings as JSON
    Config {
        #[command(flatten)]
        format: FormatArgs,
    },
}

/// Flags describing a CSV format.
#[derive(Args, Debug, Default)]
struct FormatArgs {
    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Field delimiter (`\t` or `tab` for tabulation)
    #[arg(short, long)]
    delimiter: Option<String>,

    /// Record separator: lf, crlf or none
    #[arg(long)]
    record_separator: Option<LineSeparator>,

    /// Quote character
    #[arg(long, conflicts_with = "no_quote")]
    quote: Option<String>,

    /// Disable quoting
    #[arg(long)]
    no_quote: bool,

    /// Escape character
    #[arg(long)]
    escape: Option<String>,

    /// Quote mode: all, none, minimal or non-numeric
    #[arg(long)]
    quote_mode: Option<QuoteMode>,

    /// Trim surrounding whitespace of every field
    #[arg(long)]
    trim: bool,

    /// Columns as `name` or `name=HEADER`, comma separated
    #[arg(short, long)]
    columns: Option<String>,
}

/// Output format overrides for `convert`.
#[derive(Args, Debug, Default)]
struct TargetArgs {
    /// Output delimiter
    #[arg(long)]
    to_delimiter: Option<String>,

    /// Output record separator
    #[arg(long)]
    to_record_separator: Option<LineSeparator>,

    /// Output quote mode
    #[arg(long)]
    to_quote_mode: Option<QuoteMode>,

    /// Output columns; fields are matched by logical name
    #[arg(long)]
    to_columns: Option<String>,
}

#[derive(Args, Debug, Default)]
struct CharsetArgs {
    /// Input charset label, or `auto` to detect it
    #[arg(long, default_value = "utf-8")]
    input_charset: String,

    /// Output charset label
    #[arg(long, default_value = "utf-8")]
    output_charset: String,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.quiet || cli.log_json {
        LOG_BROADCASTER.set_echo(false);
    }
    let mut collector = cli.log_json.then(|| LOG_BROADCASTER.collect());

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            format,
            charsets,
        } => cmd_encode(input.as_deref(), output.as_deref(), &format, &charsets),

        Commands::Decode {
            input,
            output,
            format,
            charsets,
        } => cmd_decode(input.as_deref(), output.as_deref(), &format, &charsets),

        Commands::Convert {
            input,
            output,
            format,
            target,
            charsets,
        } => cmd_convert(input.as_deref(), output.as_deref(), &format, &target, &charsets),

        Commands::Config { format } => cmd_config(&format),
    };

    if let Some(collector) = collector.as_mut() {
        if let Err(e) = &result {
            log_error(e.to_string());
        }
        print_json_logs(collector);
    }

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn print_json_logs(collector: &mut LogCollector) {
    for entry in collector.drain() {
        if let Ok(line) = serde_json::to_string(&entry) {
            eprintln!("{}", line);
        }
    }
    if collector.missed() > 0 {
        let dropped = LogEntry::new(
            LogLevel::Warning,
            format!("{} log entries dropped", collector.missed()),
        );
        if let Ok(line) = serde_json::to_string(&dropped) {
            eprintln!("{}", line);
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

fn cmd_encode(
    input: Option<&Path>,
    output: Option<&Path>,
    args: &FormatArgs,
    charsets: &CharsetArgs,
) -> CliResult<()> {
    let format = args.resolve()?.build()?;

    with_source(input, charsets, |source| {
        with_sink(output, charsets, |sink| {
            let text = source.open_text()?;
            let values = serde_json::Deserializer::from_reader(text).into_iter::<Value>();

            let mut failure: Option<Box<dyn Error>> = None;
            let rows = values.map_while(|value| {
                let row = value
                    .map_err(|e| -> Box<dyn Error> { Box::new(e) })
                    .and_then(|v| json_row(v, &format));
                match row {
                    Ok(row) => Some(row),
                    Err(e) => {
                        failure = Some(e);
                        None
                    }
                }
            });

            format.for_output_to(sink).apply(rows)?;
            match failure {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    })
}

fn cmd_decode(
    input: Option<&Path>,
    output: Option<&Path>,
    args: &FormatArgs,
    charsets: &CharsetArgs,
) -> CliResult<()> {
    let format = args.resolve()?.build()?;

    with_source(input, charsets, |source| {
        with_sink(output, charsets, |sink| {
            let records = format.for_input_from(source).apply(|record| record.to_json())?;
            let written = sink.write(|out| {
                for json in records {
                    out.write_line(&json?.to_string(), LineSeparator::Lf)?;
                }
                Ok::<_, PipelineError>(out.lines_written())
            })?;
            log_info(format!("Decoded {} records", written));
            Ok(())
        })
    })
}

fn cmd_convert(
    input: Option<&Path>,
    output: Option<&Path>,
    args: &FormatArgs,
    target: &TargetArgs,
    charsets: &CharsetArgs,
) -> CliResult<()> {
    let from = args.resolve()?.build()?;
    let to = target.apply(&from)?;

    if from.has_header() && !to.has_header() {
        log_warning("Input has a header but output columns are empty, header dropped");
    }

    with_source(input, charsets, |source| {
        with_sink(output, charsets, |sink| {
            let records = from.for_input_from(source).try_apply(|record| convert_row(&record, &to))?;

            let mut failure: Option<PipelineError> = None;
            let rows = records.map_while(|row| match row {
                Ok(row) => Some(row),
                Err(e) => {
                    failure = Some(e);
                    None
                }
            });

            to.for_output_to(sink).apply(rows)?;
            match failure {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        })
    })
}

fn cmd_config(args: &FormatArgs) -> CliResult<()> {
    let settings = args.resolve()?;
    // validate before printing
    settings.build()?;
    println!("{}", settings.to_json()?);
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

impl FormatArgs {
    /// Defaults, then config file, then environment, then flags.
    fn resolve(&self) -> Result<FormatSettings, FormatError> {
        let settings = match &self.config {
            Some(path) => FormatSettings::load(path)?,
            None => FormatSettings::default(),
        };
        let mut settings = settings.apply_env()?;

        if let Some(delimiter) = &self.delimiter {
            settings.delimiter = parse_char("--delimiter", delimiter)?;
        }
        if let Some(separator) = self.record_separator {
            settings.record_separator = separator;
        }
        if self.no_quote {
            settings.quote = None;
        } else if let Some(quote) = &self.quote {
            settings.quote = parse_optional_char("--quote", quote)?;
        }
        if let Some(escape) = &self.escape {
            settings.escape = parse_optional_char("--escape", escape)?;
        }
        if let Some(mode) = self.quote_mode {
            settings.quote_mode = mode;
        }
        if self.trim {
            settings.auto_trim = true;
        }
        if let Some(columns) = &self.columns {
            settings.columns = parse_columns("--columns", columns)?;
        }
        Ok(settings)
    }
}

impl TargetArgs {
    fn apply(&self, from: &CsvFormat) -> Result<CsvFormat, FormatError> {
        let mut builder = CsvFormat::builder_from(from);
        if let Some(delimiter) = &self.to_delimiter {
            builder = builder.delimiter(parse_char("--to-delimiter", delimiter)?);
        }
        if let Some(separator) = self.to_record_separator {
            builder = builder.record_separator(separator);
        }
        if let Some(mode) = self.to_quote_mode {
            builder = builder.quote_mode(mode);
        }
        if let Some(columns) = &self.to_columns {
            builder = builder.columns(parse_columns("--to-columns", columns)?);
        }
        builder.build()
    }
}

fn charset(label: &str) -> Result<&'static Encoding, FormatError> {
    encoding_for_label(label)
        .ok_or_else(|| FormatError::invalid_setting("charset", format!("unknown charset '{}'", label)))
}

fn with_source<T>(
    input: Option<&Path>,
    charsets: &CharsetArgs,
    f: impl FnOnce(&Input) -> CliResult<T>,
) -> CliResult<T> {
    let detected = if charsets.input_charset.eq_ignore_ascii_case("auto") {
        None
    } else {
        Some(charset(&charsets.input_charset)?)
    };

    let source = match input {
        Some(path) => Input::File(FileReader::new(path).with_charset(detected)),
        None => Input::Stdin(StreamReader::new(io::stdin().lock()).with_charset(detected)),
    };
    f(&source)
}

fn with_sink<T>(
    output: Option<&Path>,
    charsets: &CharsetArgs,
    f: impl FnOnce(&Output) -> CliResult<T>,
) -> CliResult<T> {
    let encoding = charset(&charsets.output_charset)?;
    if encoding != UTF_8 {
        log_info(format!("Output charset: {}", encoding.name()));
    }

    let sink = match output {
        Some(path) => Output::File(FileWriter::new(path).with_charset(encoding)),
        None => Output::Stdout(StreamWriter::new(io::stdout().lock()).with_charset(encoding)),
    };
    f(&sink)
}

/// Turn one JSON line into a row: arrays as is, objects by column name.
fn json_row(value: Value, format: &CsvFormat) -> CliResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            if format.columns().is_empty() {
                return Err("JSON objects need declared columns (--columns)".into());
            }
            Ok(format
                .columns()
                .iter()
                .map(|column| map.remove(column.name()).unwrap_or(Value::Null))
                .collect())
        }
        other => Err(format!("expected a JSON array or object, got {}", other).into()),
    }
}

/// Fields of `record` in the output column order.
fn convert_row(record: &Record, to: &CsvFormat) -> Result<Vec<String>, ResolutionError> {
    if to.columns().is_empty() || record.header().is_none() {
        return Ok(record.fields().to_vec());
    }
    to.columns()
        .iter()
        .map(|column| record.get(column.name()).map(str::to_string))
        .collect()
}

// =============================================================================
// Standard streams or files
// =============================================================================

enum Input {
    File(FileReader),
    Stdin(StreamReader<StdinLock<'static>>),
}

impl TextReader for Input {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        match self {
            Input::File(reader) => reader.open(),
            Input::Stdin(reader) => reader.open(),
        }
    }

    fn charset(&self) -> Option<&'static Encoding> {
        match self {
            Input::File(reader) => reader.charset(),
            Input::Stdin(reader) => reader.charset(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Input::File(reader) => reader.describe(),
            Input::Stdin(_) => "stdin".to_string(),
        }
    }
}

enum Output {
    File(FileWriter),
    Stdout(StreamWriter<StdoutLock<'static>>),
}

impl TextWriter for Output {
    fn open(&self) -> io::Result<Box<dyn Write + '_>> {
        match self {
            Output::File(writer) => writer.open(),
            Output::Stdout(writer) => writer.open(),
        }
    }

    fn charset(&self) -> &'static Encoding {
        match self {
            Output::File(writer) => writer.charset(),
            Output::Stdout(writer) => writer.charset(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Output::File(writer) => writer.describe(),
            Output::Stdout(_) => "stdout".to_string(),
        }
    }
}
