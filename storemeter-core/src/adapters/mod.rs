//! Engine connectors for statistics collection.
//!
//! Each engine variant implements [`EngineConnection`]: a live, verified
//! connection that answers per-data-store statistics queries. Connections
//! are created through the [`Connector`] factory so the pipeline can be
//! driven against any implementation.
//!
//! # Module Structure
//! - `config`: connection settings shared by all engines
//! - `mysql`: relational engine (sqlx), feature `mysql`
//! - `mongodb`: document engine, feature `mongodb`
//!
//! # Security Guarantees
//! - All queries are read-only (COUNT, catalog lookups, collStats)
//! - Credentials are consumed from zeroizing containers and never logged

use async_trait::async_trait;

use crate::Result;
use crate::models::{DataStoreStats, EngineType};
use crate::security::DecryptedCredentials;

mod config;

#[cfg(feature = "mongodb")]
pub mod mongodb;
#[cfg(feature = "mysql")]
pub mod mysql;

pub use config::ConnectionConfig;

/// A live connection to one resource's engine.
///
/// Implementations must allow concurrent `query_data_store_stats` calls on
/// a shared reference; the collector issues them in parallel.
#[async_trait]
pub trait EngineConnection: Send + Sync {
    /// Engine variant behind this connection.
    fn engine_type(&self) -> EngineType;

    /// Explicit reachability probe, run once before any statistics query.
    ///
    /// # Errors
    /// Returns `Connection` if the engine is unreachable or rejects the
    /// credentials.
    async fn verify_reachable(&self) -> Result<()>;

    /// Collects record count, storage volume and index volume of one table
    /// or collection.
    ///
    /// # Errors
    /// Returns `Stats` when the query fails and `StatsFormat` when the engine
    /// reports sizes in an unexpected shape.
    async fn query_data_store_stats(
        &self,
        database_name: &str,
        data_store_name: &str,
    ) -> Result<DataStoreStats>;

    /// Releases the connection. Safe to call more than once.
    async fn close(&self);
}

/// Factory that opens an [`EngineConnection`] from decrypted credentials.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection for the engine named by `credentials`.
    ///
    /// # Errors
    /// Returns `Connection` if the connection cannot be established, or
    /// `UnsupportedEngine` if the engine was not compiled in.
    async fn connect(&self, credentials: &DecryptedCredentials)
    -> Result<Box<dyn EngineConnection>>;
}

/// Production connector dispatching on the credential variant.
#[derive(Debug, Clone, Default)]
pub struct EngineConnector {
    config: ConnectionConfig,
}

impl EngineConnector {
    /// Creates a connector after validating `config`.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl Connector for EngineConnector {
    async fn connect(
        &self,
        credentials: &DecryptedCredentials,
    ) -> Result<Box<dyn EngineConnection>> {
        match credentials {
            #[cfg(feature = "mysql")]
            DecryptedCredentials::MySql(secrets) => {
                let connection = mysql::MySqlConnection::connect(secrets, &self.config).await?;
                Ok(Box::new(connection))
            }
            #[cfg(not(feature = "mysql"))]
            DecryptedCredentials::MySql(_) => Err(crate::error::StoreMeterError::unsupported_engine(
                "MySQL", "mysql",
            )),
            #[cfg(feature = "mongodb")]
            DecryptedCredentials::MongoDb(secrets) => {
                let connection = mongodb::MongoConnection::connect(secrets, &self.config).await?;
                Ok(Box::new(connection))
            }
            #[cfg(not(feature = "mongodb"))]
            DecryptedCredentials::MongoDb(_) => Err(
                crate::error::StoreMeterError::unsupported_engine("MongoDB", "mongodb"),
            ),
        }
    }
}
