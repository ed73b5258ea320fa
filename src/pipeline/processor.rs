//! Pipeline orchestrator — one invocation over the current candidates.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::extract::extract_text;
use crate::ledger::Ledger;
use crate::mailbox::{MailFilter, MailboxSource, MessageRef};
use crate::parser::FieldParser;
use crate::pipeline::sink::{LogSink, TransactionSink};

/// Counters for one invocation.
///
/// `processed` is the reported result; the rest are for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Messages parsed, recorded and marked.
    pub processed: usize,
    /// Already in the ledger.
    #[serde(skip_serializing_if = "is_zero")]
    pub skipped: usize,
    /// Extracted body was empty; left unmarked for a later run.
    #[serde(skip_serializing_if = "is_zero")]
    pub empty: usize,
    /// Abandoned after an error.
    #[serde(skip_serializing_if = "is_zero")]
    pub failed: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// What happened to a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Processed,
    Skipped,
    Empty,
}

/// Drives source → ledger → extractor → parser → sinks → ledger → source.
///
/// Candidates are handled one at a time, in listing order.
pub struct PixPipeline {
    source: Arc<dyn MailboxSource>,
    ledger: Arc<dyn Ledger>,
    parser: FieldParser,
    sinks: Vec<Arc<dyn TransactionSink>>,
    filter: MailFilter,
}

impl PixPipeline {
    /// Pipeline with the built-in parser templates and a [`LogSink`].
    pub fn new(
        source: Arc<dyn MailboxSource>,
        ledger: Arc<dyn Ledger>,
        filter: MailFilter,
    ) -> Self {
        Self {
            source,
            ledger,
            parser: FieldParser::default_templates(),
            sinks: vec![Arc::new(LogSink)],
            filter,
        }
    }

    /// Replace the field parser.
    pub fn with_parser(mut self, parser: FieldParser) -> Self {
        self.parser = parser;
        self
    }

    /// Add a result sink after the existing ones.
    pub fn with_sink(mut self, sink: Arc<dyn TransactionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Run one invocation.
    ///
    /// Only a listing failure is returned as an error. Failures on a single
    /// candidate are logged and counted, and the run moves on.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        info!(source = self.source.name(), "Checking for Pix notifications");

        let candidates = match self.source.list_candidates(&self.filter).await {
            Ok(c) => c,
            Err(e) => {
                error!(source = self.source.name(), error = %e, "Failed to list candidates");
                return Err(e.into());
            }
        };

        let mut summary = RunSummary::default();

        if candidates.is_empty() {
            info!("No new notifications");
            return Ok(summary);
        }

        debug!(count = candidates.len(), "Listed candidates");

        for candidate in &candidates {
            match self.process_candidate(candidate).await {
                Ok(Outcome::Processed) => summary.processed += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Ok(Outcome::Empty) => summary.empty += 1,
                Err(e) => {
                    error!(id = %candidate.id, error = %e, "Failed to process notification");
                    summary.failed += 1;
                }
            }
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            empty = summary.empty,
            failed = summary.failed,
            "Finished. Processed {} notification(s)",
            summary.processed
        );
        Ok(summary)
    }

    async fn process_candidate(&self, candidate: &MessageRef) -> Result<Outcome, PipelineError> {
        if self.ledger.has(&candidate.id).await? {
            debug!(id = %candidate.id, "Already processed, skipping");
            return Ok(Outcome::Skipped);
        }

        let message = self.source.fetch_full(candidate).await?;
        let body = extract_text(&message);
        if body.is_empty() {
            warn!(id = %candidate.id, "Empty body, leaving unmarked");
            return Ok(Outcome::Empty);
        }

        let tx = self.parser.parse(&body);
        if !tx.is_recognized() {
            warn!(id = %candidate.id, "Notification format not recognised");
        }

        for sink in &self.sinks {
            sink.record(&candidate.id, &tx).await?;
        }

        self.ledger.mark(&candidate.id).await?;
        self.source.mark_processed(candidate).await?;

        Ok(Outcome::Processed)
    }
}
