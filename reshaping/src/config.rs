// ********* Input data structures ***********

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

use serde::Serialize;

/// The content of a single cell, as surfaced by a spreadsheet decoder.
///
/// Dates are not a separate variant: a decoder hands them over either as a
/// spreadsheet serial (`Number`) or as pre-formatted `Text`.
#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
    /// A blank cell, or a field that a member of a group did not have.
    Empty,
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            // Integral floats print without a fractional part: 1.0 -> "1"
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Empty => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// One decoded row: a flat mapping from field name to value.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Record {
    fields: HashMap<String, Value>,
    line: Option<usize>,
}

impl Record {
    pub fn new() -> Record {
        Record {
            fields: HashMap::new(),
            line: None,
        }
    }

    /// Sets the line (1-based, header included) this record was read from.
    pub fn with_line(mut self, line: usize) -> Record {
        self.line = Some(line);
        self
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Record
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Record {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            line: None,
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The grouping key of this record, stringified. A blank cell counts as
    /// a missing key.
    pub fn key(&self, key_field: &str) -> Option<String> {
        match self.fields.get(key_field) {
            None | Some(Value::Empty) => None,
            Some(v) => Some(v.to_string()),
        }
    }
}

// ********* Schema **********

/// What to do with a record that does not carry the key field.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum MissingKeyPolicy {
    /// Stop and report the offending record.
    #[default]
    Reject,
    /// Group the record under the empty-string key.
    EmptyKey,
}

/// The layout of the table to reshape: one key field plus the ordered
/// list of fields that repeat once per member of a group.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Schema {
    pub key_field: String,
    pub measurement_fields: Vec<String>,
    /// Measurement fields holding dates, normalized to `yyyy-mm-dd` before
    /// pivoting.
    pub date_fields: Vec<String>,
    pub missing_key: MissingKeyPolicy,
}

impl Schema {
    pub fn new(key_field: &str, measurement_fields: &[&str]) -> Schema {
        Schema {
            key_field: key_field.to_string(),
            measurement_fields: measurement_fields.iter().map(|s| s.to_string()).collect(),
            date_fields: Vec::new(),
            missing_key: MissingKeyPolicy::Reject,
        }
    }

    pub fn with_date_fields(mut self, date_fields: &[&str]) -> Schema {
        self.date_fields = date_fields.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_missing_key(mut self, policy: MissingKeyPolicy) -> Schema {
        self.missing_key = policy;
        self
    }

    /// Participant ratings collected over time.
    pub fn ratings() -> Schema {
        Schema::new("Participant", &["Time", "Rating"])
    }

    /// PHQ questionnaire scores exported from REDCap, one row per event.
    pub fn phq() -> Schema {
        Schema::new(
            "record_id",
            &["redcap_event_name", "phq_timestamp", "phq_score"],
        )
        .with_date_fields(&["phq_timestamp"])
    }

    pub fn preset(name: &str) -> Option<Schema> {
        match name {
            "ratings" => Some(Schema::ratings()),
            "phq" => Some(Schema::phq()),
            _ => None,
        }
    }

    pub fn measurement_count(&self) -> usize {
        self.measurement_fields.len()
    }
}

// ******** Output data structures *********

/// All the records sharing one key, in input order.
#[derive(PartialEq, Debug, Clone)]
pub struct Group {
    pub key: String,
    pub members: Vec<Record>,
}

/// One wide row: the key field first, then `field{position}` entries in the
/// order they were appended during pivoting.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct OutputRow {
    pub fields: Vec<(String, Value)>,
}

impl OutputRow {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// The key value, which always comes first.
    pub fn key(&self) -> Option<&Value> {
        self.fields.first().map(|(_, v)| v)
    }
}

/// The result of a complete reshaping: the header list and the rows.
#[derive(PartialEq, Debug, Clone)]
pub struct Reshaped {
    pub headers: Vec<String>,
    pub rows: Vec<OutputRow>,
}

/// Errors that prevent the reshaping from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ReshapeErrors {
    /// The record at this position (0-based, in input order) has no key.
    /// `line` is the line of the source sheet, when the decoder knows it.
    MissingKeyField {
        index: usize,
        line: Option<usize>,
        key_field: String,
    },
}

impl Error for ReshapeErrors {}

impl Display for ReshapeErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReshapeErrors::MissingKeyField {
                index,
                line: Some(line),
                key_field,
            } => write!(
                f,
                "line {} (record {}) is missing the key field {:?}",
                line, index, key_field
            ),
            ReshapeErrors::MissingKeyField {
                index,
                line: None,
                key_field,
            } => write!(
                f,
                "record {} (0-based, blank rows excluded) is missing the key field {:?}",
                index, key_field
            ),
        }
    }
}
