//! Decoded records and header name resolution.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ResolutionError, ResolutionResult};
use crate::models::Column;

// =============================================================================
// Header Index
// =============================================================================

/// Logical name to field position map, built once per input.
///
/// Physical names are matched exactly first, then ASCII case-insensitively.
/// With duplicates, the first header occurrence and the first declared
/// column win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    header: Option<Vec<String>>,
    positions: HashMap<String, usize>,
    logical_order: Vec<String>,
}

impl HeaderIndex {
    /// Index for schema-less input: fields are addressed by position only.
    pub fn positional() -> Self {
        Self::default()
    }

    /// Resolve declared `columns` against the physical `header` of an input.
    pub fn resolve(columns: &[Column], header: Vec<String>) -> Self {
        let mut exact: HashMap<&str, usize> = HashMap::with_capacity(header.len());
        let mut folded: HashMap<String, usize> = HashMap::with_capacity(header.len());
        for (pos, name) in header.iter().enumerate() {
            exact.entry(name.as_str()).or_insert(pos);
            folded.entry(name.to_ascii_lowercase()).or_insert(pos);
        }

        let mut positions = HashMap::with_capacity(columns.len());
        let mut logical_order = Vec::with_capacity(columns.len());
        for column in columns {
            let physical = column.physical_name();
            let pos = exact
                .get(physical)
                .or_else(|| folded.get(&physical.to_ascii_lowercase()))
                .copied();

            if let Some(pos) = pos {
                if !positions.contains_key(column.name()) {
                    positions.insert(column.name().to_string(), pos);
                    logical_order.push(column.name().to_string());
                }
            }
        }

        Self {
            header: Some(header),
            positions,
            logical_order,
        }
    }

    /// Physical header as read from the input.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Field position of a logical column.
    pub fn position(&self, logical: &str) -> Option<usize> {
        self.positions.get(logical).copied()
    }

    /// Logical names that resolved, in declaration order.
    pub fn resolved_columns(&self) -> impl Iterator<Item = &str> {
        self.logical_order.iter().map(String::as_str)
    }
}

// =============================================================================
// Record
// =============================================================================

/// One decoded input record.
///
/// Lookups by logical name go through the shared [`HeaderIndex`]; a name
/// missing from the input header only fails when it is accessed.
#[derive(Debug, Clone)]
pub struct Record {
    fields: Vec<String>,
    line: u64,
    index: Arc<HeaderIndex>,
}

impl Record {
    pub fn new(fields: Vec<String>, line: u64, index: Arc<HeaderIndex>) -> Self {
        Self { fields, line, index }
    }

    /// Field of a logical column.
    pub fn get(&self, logical: &str) -> ResolutionResult<&str> {
        let position = self
            .index
            .position(logical)
            .ok_or_else(|| ResolutionError::NotFound(logical.to_string()))?;

        self.fields
            .get(position)
            .map(String::as_str)
            .ok_or_else(|| ResolutionError::MissingField {
                column: logical.to_string(),
                position,
                width: self.fields.len(),
                line: self.line,
            })
    }

    /// Field at a physical position.
    pub fn get_at(&self, position: usize) -> ResolutionResult<&str> {
        self.fields
            .get(position)
            .map(String::as_str)
            .ok_or(ResolutionError::OutOfRange {
                position,
                width: self.fields.len(),
            })
    }

    /// Whether `logical` resolves to a field of this record.
    pub fn contains(&self, logical: &str) -> bool {
        self.get(logical).is_ok()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 1-based input line where the record starts.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    pub fn header(&self) -> Option<&[String]> {
        self.index.header()
    }

    /// JSON view: an object of resolvable logical columns, or an array of
    /// fields when the input has no schema.
    pub fn to_json(&self) -> Value {
        if self.index.header().is_none() {
            return Value::Array(self.fields.iter().cloned().map(Value::String).collect());
        }

        let mut obj = Map::new();
        for name in self.index.resolved_columns() {
            if let Ok(value) = self.get(name) {
                obj.insert(name.to_string(), Value::String(value.to_string()));
            }
        }
        Value::Object(obj)
    }
}
