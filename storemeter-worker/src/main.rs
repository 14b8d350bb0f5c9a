//! Data-store volume collection worker.
//!
//! Reads poll events, measures the listed tables and collections of each
//! resource and writes measurements as JSON lines on stdout. Logs go to
//! stderr.
//!
//! # Security Guarantees
//! - Read-only engine operations only
//! - Decrypted credentials live for one invocation and are zeroized on drop
//! - Registry and engine connection strings are redacted in logs

use anyhow::Context;
use clap::Parser;
use storemeter_core::FieldCipher as _;
use storemeter_core::logging::init_logging;
use storemeter_worker::cli::{Cli, Command};
use storemeter_worker::intake::process_events;
use storemeter_worker::{build_pipeline, stdout_sink};
use tokio::io::BufReader;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_json)?;

    match &cli.command {
        Some(Command::Encrypt { plaintext }) => {
            let cipher = cli.cipher.build()?;
            println!("{}", cipher.encrypt(plaintext)?);
            Ok(())
        }
        Some(Command::Decrypt { ciphertext }) => {
            let cipher = cli.cipher.build()?;
            let plaintext = cipher.decrypt(ciphertext)?;
            println!("{}", plaintext.as_str());
            Ok(())
        }
        Some(Command::Run) | None => run(&cli).await,
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&cli.run, &cli.cipher, stdout_sink()).await?;
    info!(
        topic = pipeline.publisher().topic(),
        max_concurrency = cli.run.max_concurrency,
        "Worker started"
    );

    let intake = async {
        match &cli.run.input {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                process_events(&pipeline, BufReader::new(file))
                    .await
                    .context("failed to read poll events")
            }
            None => process_events(&pipeline, BufReader::new(tokio::io::stdin()))
                .await
                .context("failed to read poll events"),
        }
    };

    let finished = tokio::select! {
        result = intake => result.map(Some),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; abandoning the event in progress");
            Ok(None)
        }
    };

    if let Ok(Some(summary)) = &finished {
        info!(
            events = summary.events,
            records_published = summary.records_published,
            "Worker finished"
        );
    }

    let stats = pipeline.publisher().stats();
    info!(
        published = stats.published(),
        failed = stats.failed(),
        "Publisher totals"
    );
    pipeline.close().await;
    finished.map(|_| ())
}
