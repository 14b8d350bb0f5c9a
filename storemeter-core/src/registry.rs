//! Credential registry lookups.
//!
//! The registry keeps one encrypted credential row per resource and engine.
//! A missing row is a normal outcome ("no such resource") and is reported as
//! `Ok(None)`; only a failing query is an error.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

use crate::Result;
use crate::error::{StoreMeterError, redact_database_url};
use crate::models::EngineType;
use crate::security::{EncryptedCredentials, EncryptedMongoCredentials, EncryptedMySqlCredentials};

const MYSQL_CREDENTIALS_QUERY: &str = "SELECT host, port, username, password, databaseName \
     FROM MySqlCredentials WHERE resourceId = ?";

const MONGODB_CREDENTIALS_QUERY: &str =
    "SELECT uri, databaseName FROM MongoDbCredentials WHERE resourceId = ?";

/// Source of encrypted credential rows.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetches the MySQL credential row for a resource.
    async fn mysql_credentials(&self, resource_id: i64)
    -> Result<Option<EncryptedMySqlCredentials>>;

    /// Fetches the MongoDB credential row for a resource.
    async fn mongodb_credentials(
        &self,
        resource_id: i64,
    ) -> Result<Option<EncryptedMongoCredentials>>;

    /// Releases any connections held by the store.
    async fn close(&self) {}
}

/// Resolves the credential record of `resource_id` for `engine_type`.
///
/// # Returns
/// `Ok(None)` when the registry holds no record for the resource.
///
/// # Errors
/// Returns `Registry` if the lookup itself fails.
pub async fn resolve(
    store: &dyn CredentialStore,
    resource_id: i64,
    engine_type: EngineType,
) -> Result<Option<EncryptedCredentials>> {
    tracing::debug!(resource_id, engine = %engine_type, "Resolving credentials");

    let credentials = match engine_type {
        EngineType::Relational => store
            .mysql_credentials(resource_id)
            .await?
            .map(EncryptedCredentials::MySql),
        EngineType::Document => store
            .mongodb_credentials(resource_id)
            .await?
            .map(EncryptedCredentials::MongoDb),
    };

    Ok(credentials)
}

/// Registry backed by the central MySQL database.
#[derive(Clone)]
pub struct SqlRegistry {
    pool: MySqlPool,
}

impl std::fmt::Debug for SqlRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlRegistry")
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

impl SqlRegistry {
    /// Connects to the registry database.
    ///
    /// # Errors
    /// Returns `Registry` if the pool cannot reach the database.
    pub async fn connect(database_url: &str, connect_timeout: Duration) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| {
                StoreMeterError::registry_failed(
                    format!(
                        "Failed to connect to registry at {}",
                        redact_database_url(database_url)
                    ),
                    e,
                )
            })?;

        tracing::info!(
            registry = %redact_database_url(database_url),
            "Connected to credential registry"
        );
        Ok(Self { pool })
    }
}

#[async_trait]
impl CredentialStore for SqlRegistry {
    async fn mysql_credentials(
        &self,
        resource_id: i64,
    ) -> Result<Option<EncryptedMySqlCredentials>> {
        let row: Option<(String, String, String, String, String)> =
            sqlx::query_as(MYSQL_CREDENTIALS_QUERY)
                .bind(resource_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    StoreMeterError::registry_failed(
                        format!("MySQL credential lookup for resource {}", resource_id),
                        e,
                    )
                })?;

        Ok(row.map(
            |(host, port, username, password, database_name)| EncryptedMySqlCredentials {
                host,
                port,
                username,
                password,
                database_name,
            },
        ))
    }

    async fn mongodb_credentials(
        &self,
        resource_id: i64,
    ) -> Result<Option<EncryptedMongoCredentials>> {
        let row: Option<(String, String)> = sqlx::query_as(MONGODB_CREDENTIALS_QUERY)
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                StoreMeterError::registry_failed(
                    format!("MongoDB credential lookup for resource {}", resource_id),
                    e,
                )
            })?;

        Ok(row.map(|(uri, database_name)| EncryptedMongoCredentials { uri, database_name }))
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Closed credential registry pool");
    }
}

/// In-memory registry for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    mysql: HashMap<i64, EncryptedMySqlCredentials>,
    mongodb: HashMap<i64, EncryptedMongoCredentials>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers MySQL credentials for a resource.
    pub fn with_mysql(mut self, resource_id: i64, credentials: EncryptedMySqlCredentials) -> Self {
        self.mysql.insert(resource_id, credentials);
        self
    }

    /// Registers MongoDB credentials for a resource.
    pub fn with_mongodb(
        mut self,
        resource_id: i64,
        credentials: EncryptedMongoCredentials,
    ) -> Self {
        self.mongodb.insert(resource_id, credentials);
        self
    }
}

#[async_trait]
impl CredentialStore for MemoryRegistry {
    async fn mysql_credentials(
        &self,
        resource_id: i64,
    ) -> Result<Option<EncryptedMySqlCredentials>> {
        Ok(self.mysql.get(&resource_id).cloned())
    }

    async fn mongodb_credentials(
        &self,
        resource_id: i64,
    ) -> Result<Option<EncryptedMongoCredentials>> {
        Ok(self.mongodb.get(&resource_id).cloned())
    }
}
