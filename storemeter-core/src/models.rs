//! Data model for poll requests, engine statistics and measurements.
//!
//! The inbound poll event and the outbound measurement message are external
//! contracts; their serde representations match the queue payloads exactly
//! (camelCase keys, `"mySql"` / `"mongoDb"` engine tags).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Database technology behind a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineType {
    /// Relational engine (MySQL); data stores are tables
    #[serde(rename = "mySql")]
    Relational,
    /// Document engine (MongoDB); data stores are collections
    #[serde(rename = "mongoDb")]
    Document,
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relational => write!(f, "MySQL"),
            Self::Document => write!(f, "MongoDB"),
        }
    }
}

/// A table or collection inside a resource's database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStore {
    pub id: i64,
    pub name: String,
}

impl DataStore {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One poll request: a resource and the data stores to measure.
///
/// Deserializes directly from the inbound event
/// `{"dataSourceId": 42, "type": "mongoDb", "dataStores": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    #[serde(rename = "dataSourceId")]
    pub id: i64,
    #[serde(rename = "type")]
    pub engine_type: EngineType,
    #[serde(rename = "dataStores", default)]
    pub data_stores: Vec<DataStore>,
}

impl ResourceDescriptor {
    /// Decodes an inbound poll event.
    ///
    /// # Errors
    /// Returns `InvalidEvent` when the payload is not a valid event, including
    /// an unknown engine `type`.
    pub fn from_event(payload: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(payload).map_err(|e| crate::StoreMeterError::InvalidEvent {
            context: "payload is not a poll event".to_string(),
            source: e,
        })
    }
}

/// Kind of measurement emitted per data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Exact number of rows or documents
    #[serde(rename = "recordCount")]
    RecordCount,
    /// Storage volume in megabytes
    #[serde(rename = "dataStoreVolume")]
    StorageVolumeMb,
    /// Index volume in megabytes
    #[serde(rename = "indexSize")]
    IndexVolumeMb,
}

impl MetricKind {
    /// All metric kinds, in emission order.
    pub const ALL: [Self; 3] = [Self::RecordCount, Self::StorageVolumeMb, Self::IndexVolumeMb];

    /// Tag carried in the `dataType` field of outbound messages.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::RecordCount => "recordCount",
            Self::StorageVolumeMb => "dataStoreVolume",
            Self::IndexVolumeMb => "indexSize",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Numeric payload of a measurement. Counts are integers, volumes are floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MeasurementPayload {
    Integer(i64),
    Float(f64),
}

/// One emitted fact about a data store.
///
/// Records are immutable; the constructors pair each [`MetricKind`] with the
/// matching payload representation. Serializes to the outbound message shape
/// `{"dataStoreId", "resourceId", "dataType", "payload"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    data_store_id: i64,
    resource_id: i64,
    #[serde(rename = "dataType")]
    metric_kind: MetricKind,
    payload: MeasurementPayload,
}

impl MeasurementRecord {
    /// Records emitted for each measured data store.
    pub const PER_DATA_STORE: usize = MetricKind::ALL.len();

    /// Record count measurement.
    pub fn record_count(resource_id: i64, data_store_id: i64, count: i64) -> Self {
        Self {
            data_store_id,
            resource_id,
            metric_kind: MetricKind::RecordCount,
            payload: MeasurementPayload::Integer(count),
        }
    }

    /// Storage volume measurement in megabytes.
    pub fn storage_volume(resource_id: i64, data_store_id: i64, megabytes: f64) -> Self {
        Self {
            data_store_id,
            resource_id,
            metric_kind: MetricKind::StorageVolumeMb,
            payload: MeasurementPayload::Float(megabytes),
        }
    }

    /// Index volume measurement in megabytes.
    pub fn index_volume(resource_id: i64, data_store_id: i64, megabytes: f64) -> Self {
        Self {
            data_store_id,
            resource_id,
            metric_kind: MetricKind::IndexVolumeMb,
            payload: MeasurementPayload::Float(megabytes),
        }
    }

    pub fn resource_id(&self) -> i64 {
        self.resource_id
    }

    pub fn data_store_id(&self) -> i64 {
        self.data_store_id
    }

    pub fn metric_kind(&self) -> MetricKind {
        self.metric_kind
    }

    pub fn payload(&self) -> MeasurementPayload {
        self.payload
    }

    /// Message key used on the outbound topic: `"<resourceId>:<dataStoreId>"`.
    pub fn message_key(&self) -> String {
        format!("{}:{}", self.resource_id, self.data_store_id)
    }
}

/// Raw statistics for one data store, as returned by an engine query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataStoreStats {
    /// Exact record count
    pub record_count: i64,
    /// Storage volume in megabytes, two decimals
    pub storage_size_mb: f64,
    /// Index volume in megabytes, two decimals
    pub index_size_mb: f64,
}

impl DataStoreStats {
    /// Builds statistics from byte sizes, converting to rounded megabytes.
    pub fn from_bytes(record_count: i64, storage_bytes: u64, index_bytes: u64) -> Self {
        Self {
            record_count,
            storage_size_mb: bytes_to_megabytes(storage_bytes),
            index_size_mb: bytes_to_megabytes(index_bytes),
        }
    }

    /// Expands the statistics into the three measurement records of a data store.
    pub fn into_records(self, resource_id: i64, data_store_id: i64) -> [MeasurementRecord; 3] {
        [
            MeasurementRecord::record_count(resource_id, data_store_id, self.record_count),
            MeasurementRecord::storage_volume(resource_id, data_store_id, self.storage_size_mb),
            MeasurementRecord::index_volume(resource_id, data_store_id, self.index_size_mb),
        ]
    }
}

/// Converts a byte count to megabytes (bytes / 1024 / 1024), rounded to two
/// decimal places.
#[allow(clippy::cast_precision_loss)]
pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    let megabytes = bytes as f64 / 1024.0 / 1024.0;
    (megabytes * 100.0).round() / 100.0
}
