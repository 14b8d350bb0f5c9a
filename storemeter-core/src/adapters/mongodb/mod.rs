//! MongoDB engine connection with statistics collection.
//!
//! # Module Structure
//! - `connection`: client creation from decrypted credentials
//! - `stats`: document counts and `collStats` size decoding
//!
//! # Security Guarantees
//! - Only `ping`, `count` and `collStats` are issued
//! - The connection URI is redacted before it reaches any log or error

mod connection;
mod stats;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use mongodb::Client;
use mongodb::bson::doc;

use super::EngineConnection;
use crate::Result;
use crate::error::StoreMeterError;
use crate::models::{DataStoreStats, EngineType};

/// Verified MongoDB client for one invocation.
pub struct MongoConnection {
    client: Client,
    /// Redacted connection URI
    target: String,
}

impl std::fmt::Debug for MongoConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConnection")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl MongoConnection {
    /// Redacted URI of the deployment, safe for logs.
    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl EngineConnection for MongoConnection {
    fn engine_type(&self) -> EngineType {
        EngineType::Document
    }

    async fn verify_reachable(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| {
                StoreMeterError::connection_failed(
                    format!("MongoDB at {} did not answer ping", self.target),
                    e,
                )
            })?;

        tracing::debug!(target_db = %self.target, "MongoDB connection verified");
        Ok(())
    }

    async fn query_data_store_stats(
        &self,
        database_name: &str,
        data_store_name: &str,
    ) -> Result<DataStoreStats> {
        let database = self.client.database(database_name);
        stats::collection_stats(&database, data_store_name).await
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}
