//! Unit tests for the MongoDB adapter.

use std::time::Duration;

use mongodb::bson::{Bson, doc};
use mongodb::options::ServerApiVersion;
use zeroize::Zeroizing;

use super::MongoConnection;
use super::connection::client_options;
use super::stats::{INDEX_SIZE_FIELD, STORAGE_SIZE_FIELD, size_field};
use crate::ErrorKind;
use crate::adapters::{ConnectionConfig, EngineConnection};
use crate::models::{DataStoreStats, EngineType};
use crate::security::MongoSecrets;

#[test]
fn test_size_field_accepts_integer_widths() {
    let stats = doc! { STORAGE_SIZE_FIELD: 4096_i32, INDEX_SIZE_FIELD: 8_589_934_592_i64 };
    assert_eq!(size_field(&stats, STORAGE_SIZE_FIELD).unwrap(), 4096);
    assert_eq!(size_field(&stats, INDEX_SIZE_FIELD).unwrap(), 8_589_934_592);
}

#[test]
fn test_size_field_accepts_double() {
    let stats = doc! { STORAGE_SIZE_FIELD: 1_048_576.0_f64 };
    assert_eq!(size_field(&stats, STORAGE_SIZE_FIELD).unwrap(), 1_048_576);
}

#[test]
fn test_size_field_rejects_unexpected_types() {
    let stats = doc! {
        "asString": "4096",
        "negative": -1_i32,
        "nan": f64::NAN,
        "null": Bson::Null,
    };

    for field in ["asString", "negative", "nan", "null", "absent"] {
        let error = size_field(&stats, field).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::StatsFormat, "field {field}");
        assert!(error.to_string().contains(field));
    }
}

#[test]
fn test_collstats_sizes_convert_to_megabytes() {
    let stats = doc! { STORAGE_SIZE_FIELD: 2_097_152_i32, INDEX_SIZE_FIELD: 16_384_i32 };
    let converted = DataStoreStats::from_bytes(
        10,
        size_field(&stats, STORAGE_SIZE_FIELD).unwrap(),
        size_field(&stats, INDEX_SIZE_FIELD).unwrap(),
    );
    assert_eq!(converted.storage_size_mb, 2.0);
    assert_eq!(converted.index_size_mb, 0.02);
}

#[tokio::test]
async fn test_client_options_apply_config() {
    let config = ConnectionConfig::default()
        .with_connect_timeout(Duration::from_secs(3))
        .with_max_connections(5);
    let options = client_options("mongodb://localhost:27017", &config)
        .await
        .unwrap();

    assert_eq!(options.connect_timeout, Some(Duration::from_secs(3)));
    assert_eq!(options.server_selection_timeout, Some(Duration::from_secs(3)));
    assert_eq!(options.max_pool_size, Some(5));
    assert_eq!(options.app_name, Some(config.app_name));
    assert!(matches!(
        options.server_api.as_ref().map(|api| &api.version),
        Some(ServerApiVersion::V1)
    ));
}

#[tokio::test]
async fn test_connect_rejects_malformed_uri_without_leaking() {
    let secrets = MongoSecrets {
        uri: Zeroizing::new("postgres://app:pw@localhost/db".to_string()),
        database_name: Zeroizing::new("analytics".to_string()),
    };

    let error = MongoConnection::connect(&secrets, &ConnectionConfig::default())
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Connection);
    assert!(!error.to_string().contains(":pw@"));
}

#[tokio::test]
async fn test_connect_builds_client_lazily() {
    let secrets = MongoSecrets {
        uri: Zeroizing::new("mongodb://app:pw@localhost:27017".to_string()),
        database_name: Zeroizing::new("analytics".to_string()),
    };

    let connection = MongoConnection::connect(&secrets, &ConnectionConfig::default())
        .await
        .unwrap();
    assert_eq!(connection.engine_type(), EngineType::Document);
    assert!(connection.target().contains("app:****@"));
    assert!(!format!("{:?}", connection).contains(":pw@"));
}
