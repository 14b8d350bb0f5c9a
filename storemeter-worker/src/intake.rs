//! Poll event intake.
//!
//! Events arrive one JSON object per line. Each line is one invocation; a
//! bad line or failed invocation is logged and the loop moves on.

use storemeter_core::{InvocationOutcome, Pipeline};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Tally of invocation outcomes over one intake run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IntakeSummary {
    pub events: u64,
    pub completed: u64,
    pub credentials_absent: u64,
    pub failed: u64,
    pub rejected: u64,
    pub records_published: u64,
}

impl IntakeSummary {
    fn record(&mut self, outcome: InvocationOutcome, records_published: usize) {
        self.events = self.events.saturating_add(1);
        let counter = match outcome {
            InvocationOutcome::Completed => &mut self.completed,
            InvocationOutcome::CredentialsAbsent => &mut self.credentials_absent,
            InvocationOutcome::Failed(_) => &mut self.failed,
            InvocationOutcome::Rejected => &mut self.rejected,
        };
        *counter = counter.saturating_add(1);
        self.records_published = self
            .records_published
            .saturating_add(u64::try_from(records_published).unwrap_or(u64::MAX));
    }
}

/// Runs every event read from `reader` through `pipeline` until end of input.
///
/// Lines are handed over as raw bytes, so a line that is not UTF-8 is
/// rejected by the pipeline like any other undecodable event. Blank lines are
/// skipped.
///
/// # Errors
/// Returns an error only if reading from `reader` fails.
pub async fn process_events<R>(pipeline: &Pipeline, mut reader: R) -> std::io::Result<IntakeSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = IntakeSummary::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }

        let event = line.trim_ascii();
        if event.is_empty() {
            continue;
        }

        let report = pipeline.handle_event(event).await;
        summary.record(report.outcome, report.records_published);
    }

    tracing::info!(
        events = summary.events,
        completed = summary.completed,
        credentials_absent = summary.credentials_absent,
        failed = summary.failed,
        rejected = summary.rejected,
        records_published = summary.records_published,
        "Event intake finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storemeter_core::ErrorKind;

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = IntakeSummary::default();
        summary.record(InvocationOutcome::Completed, 6);
        summary.record(InvocationOutcome::Failed(ErrorKind::Connection), 0);
        summary.record(InvocationOutcome::Rejected, 0);
        summary.record(InvocationOutcome::CredentialsAbsent, 0);

        assert_eq!(
            summary,
            IntakeSummary {
                events: 4,
                completed: 1,
                credentials_absent: 1,
                failed: 1,
                rejected: 1,
                records_published: 6,
            }
        );
    }
}
