//! Unquoted dialect: special characters are prefixed with the escape
//! character instead of being quoted.
//!
//! Written as `<escape><char>` for the delimiter, the quote and the escape
//! character itself; line breaks become `<escape>r` and `<escape>n`.

use std::io::{BufRead, BufReader, Read};

use super::ParsedFields;
use crate::error::{GrammarError, GrammarResult};

/// Join `fields` with `delimiter`, escaping every special character.
pub(super) fn join(fields: &[&str], delimiter: u8, quote: Option<u8>, escape: u8) -> String {
    let delimiter = char::from(delimiter);
    let quote = quote.map(char::from);
    let escape = char::from(escape);

    let mut line = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum());
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(delimiter);
        }
        for ch in field.chars() {
            match ch {
                '\r' => {
                    line.push(escape);
                    line.push('r');
                }
                '\n' => {
                    line.push(escape);
                    line.push('n');
                }
                c if c == delimiter || c == escape || Some(c) == quote => {
                    line.push(escape);
                    line.push(c);
                }
                c => line.push(c),
            }
        }
    }
    line
}

/// Splits escaped input into records, one or more physical lines each.
pub(super) struct EscapedFields<R> {
    reader: BufReader<R>,
    delimiter: u8,
    escape: u8,
    trim: bool,
    line: u64,
    buf: Vec<u8>,
    done: bool,
}

impl<R: Read> EscapedFields<R> {
    pub(super) fn new(source: R, delimiter: u8, escape: u8, trim: bool) -> Self {
        Self {
            reader: BufReader::new(source),
            delimiter,
            escape,
            trim,
            line: 0,
            buf: Vec::new(),
            done: false,
        }
    }

    fn read_record(&mut self) -> GrammarResult<Option<ParsedFields>> {
        let (delimiter, escape, trim) = (self.delimiter, self.escape, self.trim);
        let start = self.line + 1;

        let mut fields = Vec::new();
        let mut field = Vec::new();
        let mut escaped = false;
        let mut read_any = false;

        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                if !read_any {
                    return Ok(None);
                }
                if escaped {
                    field.push(escape);
                }
                break;
            }
            read_any = true;
            self.line += 1;

            let mut bytes = &self.buf[..];
            let terminated = bytes.ends_with(b"\n");
            if terminated {
                bytes = &bytes[..bytes.len() - 1];
                if bytes.ends_with(b"\r") {
                    bytes = &bytes[..bytes.len() - 1];
                }
            }

            for &b in bytes {
                if escaped {
                    escaped = false;
                    field.push(match b {
                        b if b == delimiter || b == escape => b,
                        b'r' => b'\r',
                        b'n' => b'\n',
                        b't' => b'\t',
                        b => b,
                    });
                } else if b == escape {
                    escaped = true;
                } else if b == delimiter {
                    fields.push(finish_field(&mut field, trim, start)?);
                } else {
                    field.push(b);
                }
            }

            // escaped line break: the record continues on the next line
            if escaped && terminated {
                escaped = false;
                field.push(b'\n');
                continue;
            }
            break;
        }

        fields.push(finish_field(&mut field, trim, start)?);
        Ok(Some(ParsedFields { line: start, fields }))
    }
}

fn finish_field(field: &mut Vec<u8>, trim: bool, line: u64) -> GrammarResult<String> {
    let text = String::from_utf8(std::mem::take(field)).map_err(|e| GrammarError::Malformed {
        line,
        message: e.to_string(),
    })?;
    Ok(if trim { text.trim().to_string() } else { text })
}

impl<R: Read> Iterator for EscapedFields<R> {
    type Item = GrammarResult<ParsedFields>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.read_record() {
                // blank lines carry no record
                Ok(Some(parsed)) if parsed.fields.len() == 1 && parsed.fields[0].is_empty() => continue,
                Ok(Some(parsed)) => return Some(Ok(parsed)),
                Ok(None) => self.done = true,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
