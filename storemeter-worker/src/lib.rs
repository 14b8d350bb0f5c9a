//! Library module for storemeter-worker.
//!
//! Exposes the CLI definition, pipeline assembly and the event intake loop so
//! they can be tested without spawning the binary.

pub mod cli;
pub mod intake;

use std::sync::Arc;

use anyhow::Context;
use storemeter_core::error::redact_database_url;
use storemeter_core::{
    EngineConnector, JsonLinesSink, MeasurementSink, Pipeline, Publisher, SqlRegistry,
};

use cli::{CipherArgs, RunArgs};

/// Assembles a pipeline from command-line settings.
///
/// Measurements are written through `sink`.
///
/// # Errors
/// Returns an error if a setting is missing or invalid or the registry is
/// unreachable.
pub async fn build_pipeline(
    run: &RunArgs,
    cipher: &CipherArgs,
    sink: impl MeasurementSink + 'static,
) -> anyhow::Result<Pipeline> {
    let registry_url = run.registry_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("--registry-url (or REGISTRY_DATABASE_URL) is required")
    })?;

    let cipher = cipher.build()?;
    let connector = EngineConnector::new(run.connection_config())?;
    let registry = SqlRegistry::connect(registry_url, run.connect_timeout())
        .await
        .with_context(|| {
            format!(
                "credential registry at {} is unavailable",
                redact_database_url(registry_url)
            )
        })?;
    let publisher = Publisher::new(sink).with_topic(run.topic.clone());

    let pipeline = Pipeline::new(
        Arc::new(registry),
        Arc::from(cipher),
        Arc::new(connector),
        Arc::new(publisher),
    )
    .with_config(&run.pipeline_config())?;

    Ok(pipeline)
}

/// Sink used by the binary: one measurement per line on stdout.
pub fn stdout_sink() -> JsonLinesSink<tokio::io::Stdout> {
    JsonLinesSink::new(tokio::io::stdout())
}
