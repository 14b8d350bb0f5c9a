//! Per-invocation orchestration.
//!
//! One invocation walks `resolve → decrypt → connect → verify → collect →
//! publish`. Any failure ends that invocation only: [`Pipeline::run`] always
//! returns an [`InvocationReport`], never an error, so the intake loop keeps
//! serving the next event.

use std::sync::Arc;

use tracing::Instrument;

use crate::Result;
use crate::adapters::{Connector, EngineConnection};
use crate::collector::{CollectionReport, DEFAULT_MAX_CONCURRENCY, DataStoreFailure, StatsCollector};
use crate::error::{ErrorKind, StoreMeterError};
use crate::models::ResourceDescriptor;
use crate::publisher::Publisher;
use crate::registry::{self, CredentialStore};
use crate::security::FieldCipher;

/// Pipeline-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Data stores queried at once within one invocation
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl PipelineConfig {
    /// Validates pipeline settings.
    ///
    /// # Errors
    /// Returns `Configuration` if `max_concurrency` is 0 or above 100.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 || self.max_concurrency > 100 {
            return Err(StoreMeterError::configuration(format!(
                "max_concurrency must be between 1 and 100, got {}",
                self.max_concurrency
            )));
        }
        Ok(())
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Statistics were collected and handed to the publisher. Individual
    /// data stores or records may still have failed.
    Completed,
    /// The registry holds no credentials for the resource
    CredentialsAbsent,
    /// The invocation stopped before collection
    Failed(ErrorKind),
    /// The inbound event could not be decoded
    Rejected,
}

/// Summary of one invocation.
#[derive(Debug)]
pub struct InvocationReport {
    /// `None` for rejected events
    pub resource_id: Option<i64>,
    pub outcome: InvocationOutcome,
    pub records_published: usize,
    pub publish_failures: usize,
    pub store_failures: Vec<DataStoreFailure>,
}

impl InvocationReport {
    fn ended(resource_id: i64, outcome: InvocationOutcome) -> Self {
        Self {
            resource_id: Some(resource_id),
            outcome,
            records_published: 0,
            publish_failures: 0,
            store_failures: Vec::new(),
        }
    }

    fn rejected() -> Self {
        Self {
            resource_id: None,
            outcome: InvocationOutcome::Rejected,
            records_published: 0,
            publish_failures: 0,
            store_failures: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == InvocationOutcome::Completed
    }
}

/// Drives credential resolution, collection and publishing for each
/// resource descriptor.
pub struct Pipeline {
    store: Arc<dyn CredentialStore>,
    cipher: Arc<dyn FieldCipher>,
    connector: Arc<dyn Connector>,
    publisher: Arc<Publisher>,
    collector: StatsCollector,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("publisher", &self.publisher)
            .field("collector", &self.collector)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with default settings.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cipher: Arc<dyn FieldCipher>,
        connector: Arc<dyn Connector>,
        publisher: Arc<Publisher>,
    ) -> Self {
        Self {
            store,
            cipher,
            connector,
            publisher,
            collector: StatsCollector::default(),
        }
    }

    /// Applies validated pipeline settings.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn with_config(mut self, config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        self.collector = StatsCollector::new(config.max_concurrency);
        Ok(self)
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Releases the credential store's connections. Call once intake ends.
    pub async fn close(&self) {
        self.store.close().await;
    }

    /// Decodes an inbound poll event and runs it.
    ///
    /// Undecodable events, including unknown engine types, are logged and
    /// reported as [`InvocationOutcome::Rejected`].
    pub async fn handle_event(&self, payload: &[u8]) -> InvocationReport {
        match ResourceDescriptor::from_event(payload) {
            Ok(resource) => self.run(&resource).await,
            Err(error) => {
                tracing::warn!(
                    error_kind = %error.kind(),
                    payload_len = payload.len(),
                    "Rejected inbound event: {}",
                    error
                );
                InvocationReport::rejected()
            }
        }
    }

    /// Runs one invocation for `resource`.
    pub async fn run(&self, resource: &ResourceDescriptor) -> InvocationReport {
        let span = tracing::info_span!(
            "invocation",
            resource_id = resource.id,
            engine = %resource.engine_type,
            data_stores = resource.data_stores.len()
        );
        self.run_inner(resource).instrument(span).await
    }

    async fn run_inner(&self, resource: &ResourceDescriptor) -> InvocationReport {
        let collection = match self.collect(resource).await {
            Ok(Some(collection)) => collection,
            Ok(None) => {
                tracing::info!("No credentials registered for resource; nothing to collect");
                return InvocationReport::ended(resource.id, InvocationOutcome::CredentialsAbsent);
            }
            Err(error) => {
                tracing::error!(
                    error_kind = %error.kind(),
                    "Invocation failed: {}",
                    error
                );
                return InvocationReport::ended(
                    resource.id,
                    InvocationOutcome::Failed(error.kind()),
                );
            }
        };

        let batch = self.publisher.publish_all(collection.records()).await;

        tracing::info!(
            records_published = batch.published,
            publish_failures = batch.failed,
            store_failures = collection.failures.len(),
            "Invocation completed"
        );

        InvocationReport {
            resource_id: Some(resource.id),
            outcome: InvocationOutcome::Completed,
            records_published: batch.published,
            publish_failures: batch.failed,
            store_failures: collection.failures,
        }
    }

    /// Resolves, decrypts, connects and collects. `Ok(None)` means the
    /// registry has no credentials for the resource.
    async fn collect(&self, resource: &ResourceDescriptor) -> Result<Option<CollectionReport>> {
        let Some(encrypted) =
            registry::resolve(self.store.as_ref(), resource.id, resource.engine_type).await?
        else {
            return Ok(None);
        };

        let credentials = encrypted.decrypt(self.cipher.as_ref())?;
        let connection = self.connector.connect(&credentials).await?;

        let result = self
            .collect_with(connection.as_ref(), resource, credentials.database_name())
            .await;
        connection.close().await;
        tracing::debug!("Engine connection closed");

        result.map(Some)
    }

    async fn collect_with(
        &self,
        connection: &dyn EngineConnection,
        resource: &ResourceDescriptor,
        database_name: &str,
    ) -> Result<CollectionReport> {
        connection.verify_reachable().await?;
        Ok(self
            .collector
            .collect(connection, resource.id, database_name, &resource.data_stores)
            .await)
    }
}
