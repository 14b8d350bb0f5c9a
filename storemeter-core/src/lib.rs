//! Core library for StoreMeter.
//!
//! StoreMeter measures the data stores (tables and collections) of registered
//! database resources. For each poll request it resolves the resource's
//! encrypted credentials from a central registry, decrypts them, connects to
//! the engine, collects record counts and storage/index volumes for every
//! data store concurrently, and publishes one measurement per metric.
//!
//! # Security Guarantees
//! - Credentials stay encrypted until an invocation needs them and are
//!   zeroized when it ends
//! - No plaintext secret is ever logged or included in an error message
//! - All engine operations are read-only
//!
//! # Architecture
//! - `security`: field ciphers and credential containers
//! - `registry`: credential lookup behind the [`CredentialStore`] trait
//! - `adapters`: engine connections behind the [`EngineConnection`] trait
//! - `collector`: bounded concurrent fan-out over data stores
//! - `publisher`: serialization and handoff to a [`MeasurementSink`]
//! - `pipeline`: per-invocation orchestration

pub mod adapters;
pub mod collector;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod registry;
pub mod security;

// Re-export commonly used types
pub use adapters::{ConnectionConfig, Connector, EngineConnection, EngineConnector};
pub use collector::{CollectionReport, DataStoreFailure, StatsCollector};
pub use error::{ErrorKind, Result, StoreMeterError};
pub use models::{
    DataStore, DataStoreStats, EngineType, MeasurementPayload, MeasurementRecord, MetricKind,
    ResourceDescriptor,
};
pub use pipeline::{InvocationOutcome, InvocationReport, Pipeline, PipelineConfig};
pub use publisher::{ChannelSink, JsonLinesSink, MeasurementSink, OutboundMessage, Publisher};
pub use registry::{CredentialStore, MemoryRegistry, SqlRegistry};
pub use security::{
    CipherKey, DecryptedCredentials, EncryptedCredentials, FieldCipher, LegacyCipher,
    SealedCipher,
};
