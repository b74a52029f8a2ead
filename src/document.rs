//! Data records and schema descriptors for collected flyer data.
//!
//! Flyers hand their data to the orchestrating run engine as a stream of
//! [`Record`]s described by a static schema of [`DataKey`]s:
//!
//! - **Record**: one timestamped group of co-measured scalar fields
//! - **DataKey**: the type/shape/source descriptor for one emitted field
//!
//! # Data Flow
//!
//! ```text
//! activity ──[Record]──> flyer buffer ──collect()──> run engine
//!                                        describe()─> {field: DataKey}
//! ```
//!
//! How records are persisted or indexed after collection is entirely the
//! orchestrator's concern; this module only defines the shapes that cross
//! the boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Generate a new unique cycle/document ID.
pub fn new_uid() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}

/// One timestamped datum group produced during a fly cycle.
///
/// `data` and `timestamps` always share the same key set: every field value
/// carries its own capture timestamp, which may differ from the record-level
/// `time` (e.g. for fields read back with hardware latency). Records are
/// appended by the worker during the activity, never mutated after append,
/// and moved out of the flyer during `collect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Record-level timestamp, seconds since Unix epoch.
    pub time: f64,
    /// Scalar field values (field name -> value).
    pub data: HashMap<String, f64>,
    /// Per-field capture timestamps (field name -> seconds since epoch).
    pub timestamps: HashMap<String, f64>,
}

impl Record {
    /// Creates an empty record stamped with the current wall-clock time.
    pub fn new() -> Self {
        Self::at(now_secs())
    }

    /// Creates an empty record with an explicit record-level timestamp.
    pub fn at(time: f64) -> Self {
        Self {
            time,
            data: HashMap::new(),
            timestamps: HashMap::new(),
        }
    }

    /// Adds a field stamped with the record-level time.
    ///
    /// Inserting through this builder is what keeps `data` and `timestamps`
    /// on the same key set.
    pub fn with_datum(self, field: &str, value: f64) -> Self {
        let ts = self.time;
        self.with_datum_at(field, value, ts)
    }

    /// Adds a field with an explicit per-field capture timestamp.
    pub fn with_datum_at(mut self, field: &str, value: f64, timestamp: f64) -> Self {
        self.data.insert(field.to_string(), value);
        self.timestamps.insert(field.to_string(), timestamp);
        self
    }

    /// Field names present in this record.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema for one data field emitted by a flyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataKey {
    /// Data type: "number", "integer", "string", "array".
    pub dtype: String,
    /// Shape for arrays (empty for scalars).
    pub shape: Vec<i32>,
    /// Human-readable description of where the value comes from.
    pub source: String,
    /// Physical units.
    pub units: String,
}

impl DataKey {
    /// Create a scalar number data key.
    pub fn scalar(source: &str, units: &str) -> Self {
        Self {
            dtype: "number".to_string(),
            shape: vec![],
            source: source.to_string(),
            units: units.to_string(),
        }
    }

    /// Create an array data key.
    pub fn array(source: &str, shape: Vec<i32>) -> Self {
        Self {
            dtype: "array".to_string(),
            shape,
            source: source.to_string(),
            units: String::new(),
        }
    }

    /// Override the shape descriptor.
    pub fn with_shape(mut self, shape: Vec<i32>) -> Self {
        self.shape = shape;
        self
    }
}
