//! Measurement publishing.
//!
//! Records are serialized to JSON and handed to a [`MeasurementSink`]. The
//! handoff never waits for downstream acknowledgement; failures are logged,
//! counted and returned per record.
//!
//! # Sinks
//! - [`ChannelSink`]: non-blocking push into a bounded `tokio::sync::mpsc`
//!   channel, for embedding the pipeline next to a broker producer task.
//! - [`JsonLinesSink`]: one JSON document per line on any async writer.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::Result;
use crate::error::StoreMeterError;
use crate::models::MeasurementRecord;

/// Outbound topic used when none is configured.
pub const DEFAULT_TOPIC: &str = "data-source-info-topic";

/// Destination of serialized measurements.
#[async_trait]
pub trait MeasurementSink: Send + Sync {
    /// Hands one serialized measurement to the transport.
    ///
    /// # Errors
    /// Returns `Publish` if the transport refuses the message.
    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<()>;
}

/// Message as handed to a [`ChannelSink`] consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// Sink that pushes messages into a bounded channel without waiting.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<OutboundMessage>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that drains it.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl MeasurementSink for ChannelSink {
    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<()> {
        let message = OutboundMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_vec(),
        };

        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => StoreMeterError::publish_failed(
                format!("outbound queue for '{}' is full", topic),
                std::io::Error::from(std::io::ErrorKind::WouldBlock),
            ),
            TrySendError::Closed(_) => StoreMeterError::publish_failed(
                format!("outbound queue for '{}' is closed", topic),
                std::io::Error::from(std::io::ErrorKind::BrokenPipe),
            ),
        })
    }
}

/// Sink writing each payload as one line to an async writer.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> MeasurementSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, topic: &str, _key: &str, payload: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let write = async {
            writer.write_all(payload).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        };
        write.await.map_err(|e| {
            StoreMeterError::publish_failed(format!("failed to write message for '{}'", topic), e)
        })
    }
}

/// Counters of one publisher.
#[derive(Debug, Default)]
pub struct PublishStats {
    published: AtomicU64,
    failed: AtomicU64,
}

impl PublishStats {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Outcome of publishing a batch of records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub published: usize,
    pub failed: usize,
}

/// Serializes measurement records and hands them to a sink.
pub struct Publisher {
    sink: Box<dyn MeasurementSink>,
    topic: String,
    stats: PublishStats,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.topic)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Publisher {
    /// Creates a publisher for the default outbound topic.
    pub fn new(sink: impl MeasurementSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            topic: DEFAULT_TOPIC.to_string(),
            stats: PublishStats::default(),
        }
    }

    /// Builder method to set the outbound topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn stats(&self) -> &PublishStats {
        &self.stats
    }

    /// Publishes one record.
    ///
    /// # Errors
    /// Returns `Publish` if serialization or the sink handoff fails.
    pub async fn publish(&self, record: &MeasurementRecord) -> Result<()> {
        let result = self.try_publish(record).await;
        match &result {
            Ok(()) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    async fn try_publish(&self, record: &MeasurementRecord) -> Result<()> {
        let payload = serde_json::to_vec(record).map_err(|e| {
            StoreMeterError::publish_failed(
                format!(
                    "failed to serialize {} for data store {}",
                    record.metric_kind(),
                    record.data_store_id()
                ),
                e,
            )
        })?;

        self.sink
            .send(&self.topic, &record.message_key(), &payload)
            .await?;

        tracing::trace!(
            resource_id = record.resource_id(),
            data_store_id = record.data_store_id(),
            data_type = %record.metric_kind(),
            "Published measurement"
        );
        Ok(())
    }

    /// Publishes every record, continuing past failures.
    pub async fn publish_all(&self, records: &[MeasurementRecord]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for record in records {
            match self.publish(record).await {
                Ok(()) => outcome.published = outcome.published.saturating_add(1),
                Err(error) => {
                    tracing::warn!(
                        resource_id = record.resource_id(),
                        data_store_id = record.data_store_id(),
                        data_type = %record.metric_kind(),
                        error_kind = %error.kind(),
                        "Failed to publish measurement: {}",
                        error
                    );
                    outcome.failed = outcome.failed.saturating_add(1);
                }
            }
        }

        outcome
    }
}
