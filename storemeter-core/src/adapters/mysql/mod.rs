//! MySQL engine connection with statistics collection.
//!
//! # Module Structure
//! - `connection`: pool creation from decrypted credentials
//! - `stats`: record count and catalog size queries
//!
//! # Security Guarantees
//! - All operations are read-only (SELECT only)
//! - The pool is built from discrete connect options, so the password never
//!   appears in a URL or error message

mod connection;
mod stats;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use sqlx::MySqlPool;

use super::EngineConnection;
use crate::Result;
use crate::models::{DataStoreStats, EngineType};

pub use stats::quote_identifier;

/// Verified MySQL connection for one invocation.
pub struct MySqlConnection {
    pool: MySqlPool,
    /// `host:port/database`, credentials omitted
    target: String,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("target", &self.target)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

impl MySqlConnection {
    /// Target description safe for logs.
    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl EngineConnection for MySqlConnection {
    fn engine_type(&self) -> EngineType {
        EngineType::Relational
    }

    async fn verify_reachable(&self) -> Result<()> {
        let connectivity_result: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                crate::error::StoreMeterError::connection_failed(
                    format!(
                        "MySQL at {} unreachable or credentials rejected",
                        self.target
                    ),
                    e,
                )
            })?;

        if connectivity_result != 1 {
            return Err(crate::error::StoreMeterError::connection_failed(
                format!("MySQL at {} failed the connectivity probe", self.target),
                std::io::Error::other("unexpected result from SELECT 1"),
            ));
        }

        tracing::debug!(target_db = %self.target, "MySQL connection verified");
        Ok(())
    }

    async fn query_data_store_stats(
        &self,
        database_name: &str,
        data_store_name: &str,
    ) -> Result<DataStoreStats> {
        stats::table_stats(&self.pool, database_name, data_store_name).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
