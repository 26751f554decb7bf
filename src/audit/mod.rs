//! Audit log processing.
//!
//! Uploaded bytes are turned into CSV outputs in two calls:
//! [`RecordProcessor::process`] groups records into fieldsets, then
//! [`RecordProcessor::to_csv`] renders one CSV document per fieldset.
//! [`O365AuditParser`] handles Office 365 unified audit log exports.

mod decode;
mod o365;

pub use decode::{EncodingError, decode};
pub use o365::{DEFAULT_FIELDSET, O365AuditParser};

use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Errors raised while parsing an audit log or rendering its CSV outputs.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Malformed audit log CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed AuditData JSON on line {line}: {source}")]
    AuditData {
        line: u64,
        source: serde_json::Error,
    },

    #[error("AuditData on line {line} is not a JSON object")]
    NotAnObject { line: u64 },

    #[error("Failed to write CSV output: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// One parsed record: field name → value.
pub type Record = HashMap<String, String>;

/// Field names of a fieldset, in the order they were first seen.
#[derive(Debug, Default, Clone)]
pub struct FieldNames {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl FieldNames {
    /// Add a name, returning `false` if it was already present.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.order.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Records grouped by fieldset key, with the field names of each group.
#[derive(Debug, Default)]
pub struct ParsedAudit {
    records: BTreeMap<String, Vec<Record>>,
    field_names: BTreeMap<String, FieldNames>,
}

impl ParsedAudit {
    /// Records of `key`, creating an empty group on first access.
    pub fn records_mut(&mut self, key: &str) -> &mut Vec<Record> {
        self.records.entry(key.to_string()).or_default()
    }

    /// Field names of `key`, creating an empty set on first access.
    pub fn field_names_mut(&mut self, key: &str) -> &mut FieldNames {
        self.field_names.entry(key.to_string()).or_default()
    }

    /// Append a record to `key`, registering its field names in order.
    ///
    /// When a name repeats within `fields` the later value wins.
    pub fn push(&mut self, key: &str, fields: Vec<(String, String)>) {
        let names = self.field_names_mut(key);
        for (name, _) in &fields {
            names.insert(name);
        }
        let record: Record = fields.into_iter().collect();
        self.records_mut(key).push(record);
    }

    pub fn records(&self) -> &BTreeMap<String, Vec<Record>> {
        &self.records
    }

    pub fn field_names(&self) -> &BTreeMap<String, FieldNames> {
        &self.field_names
    }

    /// Total number of records over all fieldsets.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The two-call interface between uploads and the archive packager.
pub trait RecordProcessor: Send + Sync {
    /// Parse decoded upload text into grouped records.
    fn process(&self, text: &str) -> Result<ParsedAudit, AuditError>;

    /// Render parsed records as output file name → CSV text.
    fn to_csv(&self, parsed: &ParsedAudit) -> Result<BTreeMap<String, String>, AuditError>;
}
