//! Concurrent statistics collection across the data stores of one resource.
//!
//! Every data store is queried independently over the shared connection.
//! A failing store produces no records and is reported in
//! [`CollectionReport::failures`]; it never cancels or delays the others.

use futures::stream::{self, StreamExt};

use crate::StoreMeterError;
use crate::adapters::EngineConnection;
use crate::models::{DataStore, MeasurementRecord};

/// Default number of data stores queried at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// A data store whose statistics could not be collected.
#[derive(Debug)]
pub struct DataStoreFailure {
    pub data_store_id: i64,
    pub name: String,
    pub error: StoreMeterError,
}

/// Outcome of collecting statistics for one resource.
#[derive(Debug, Default)]
pub struct CollectionReport {
    pub records: Vec<MeasurementRecord>,
    pub failures: Vec<DataStoreFailure>,
}

impl CollectionReport {
    /// Measurement records, three per successful data store.
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Number of data stores that yielded statistics.
    pub fn succeeded(&self) -> usize {
        self.records.len() / MeasurementRecord::PER_DATA_STORE
    }
}

/// Fans statistics queries out over the data stores of a resource.
#[derive(Debug, Clone, Copy)]
pub struct StatsCollector {
    max_concurrency: usize,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl StatsCollector {
    /// Creates a collector; a concurrency of 0 is raised to 1.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Collects statistics for every data store of `resource_id`.
    ///
    /// All queries are awaited before returning. Record order follows
    /// completion order; the three records of one data store stay adjacent.
    pub async fn collect(
        &self,
        connection: &dyn EngineConnection,
        resource_id: i64,
        database_name: &str,
        data_stores: &[DataStore],
    ) -> CollectionReport {
        let queries = data_stores.iter().map(|data_store| async move {
            let result = connection
                .query_data_store_stats(database_name, &data_store.name)
                .await;
            (data_store, result)
        });

        let mut results = stream::iter(queries).buffer_unordered(self.max_concurrency);
        let mut report = CollectionReport::default();

        while let Some((data_store, result)) = results.next().await {
            match result {
                Ok(stats) => {
                    tracing::debug!(
                        resource_id,
                        data_store_id = data_store.id,
                        record_count = stats.record_count,
                        storage_size_mb = stats.storage_size_mb,
                        index_size_mb = stats.index_size_mb,
                        "Collected statistics for '{}'",
                        data_store.name
                    );
                    report
                        .records
                        .extend(stats.into_records(resource_id, data_store.id));
                }
                Err(error) => {
                    tracing::warn!(
                        resource_id,
                        data_store_id = data_store.id,
                        error_kind = %error.kind(),
                        "Failed to collect statistics for '{}': {}",
                        data_store.name,
                        error
                    );
                    report.failures.push(DataStoreFailure {
                        data_store_id: data_store.id,
                        name: data_store.name.clone(),
                        error,
                    });
                }
            }
        }

        report
    }
}
