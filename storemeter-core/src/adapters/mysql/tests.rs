//! Unit tests for the MySQL adapter.
//!
//! Anything that needs a live server lives in `tests/mysql_pipeline.rs`.

use zeroize::Zeroizing;

use super::MySqlConnection;
use super::connection::connect_options;
use super::stats::{count_query, quote_identifier};
use crate::adapters::{ConnectionConfig, EngineConnection};
use crate::models::EngineType;
use crate::security::MySqlSecrets;

fn secrets() -> MySqlSecrets {
    MySqlSecrets {
        host: Zeroizing::new("db.internal".to_string()),
        port: 3307,
        username: Zeroizing::new("reporter".to_string()),
        password: Zeroizing::new("s3cret-pw".to_string()),
        database_name: Zeroizing::new("shop".to_string()),
    }
}

#[test]
fn test_quote_identifier_plain() {
    assert_eq!(quote_identifier("orders"), "`orders`");
    assert_eq!(quote_identifier("order items"), "`order items`");
}

#[test]
fn test_quote_identifier_escapes_backticks() {
    assert_eq!(quote_identifier("a`b"), "`a``b`");
    assert_eq!(
        quote_identifier("x`; DROP TABLE users; --"),
        "`x``; DROP TABLE users; --`"
    );
}

#[test]
fn test_count_query_is_schema_qualified() {
    assert_eq!(
        count_query("other", "orders"),
        "SELECT COUNT(*) FROM `other`.`orders`"
    );
    assert_eq!(
        count_query("we`ird", "odd`name"),
        "SELECT COUNT(*) FROM `we``ird`.`odd``name`"
    );
}

#[test]
fn test_connect_options_use_secrets() {
    let options = connect_options(&secrets());
    assert_eq!(options.get_host(), "db.internal");
    assert_eq!(options.get_port(), 3307);
    assert_eq!(options.get_username(), "reporter");
    assert_eq!(options.get_database(), Some("shop"));
}

#[tokio::test]
async fn test_connect_is_lazy_and_debug_hides_credentials() {
    let connection = MySqlConnection::connect(&secrets(), &ConnectionConfig::default())
        .await
        .unwrap();

    assert_eq!(connection.engine_type(), EngineType::Relational);
    assert_eq!(connection.target(), "db.internal:3307/shop");

    let debug = format!("{:?}", connection);
    assert!(debug.contains("db.internal"));
    assert!(!debug.contains("s3cret-pw"));
    assert!(!debug.contains("reporter"));

    connection.close().await;
}

#[tokio::test]
async fn test_connect_rejects_invalid_config() {
    let config = ConnectionConfig::default().with_max_connections(0);
    let error = MySqlConnection::connect(&secrets(), &config)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), crate::ErrorKind::Configuration);
}
