//! Batch runner: list, fetch, triage and mark messages from a source.
//!
//! One message's failure never stops the batch:
//! - listing failure → empty report
//! - fetch failure or unknown id → message skipped
//! - mark-processed failure → logged and swallowed
//! - raw archive failure → logged and swallowed

use std::time::Duration;

use tracing::{error, info, warn};

use crate::pipeline::processor::MessageProcessor;
use crate::pipeline::types::{MessageRecord, ProcessingMode};
use crate::source::MessageSource;
use crate::store::TriageStore;

/// Default pause between messages.
pub const DEFAULT_SLEEP_BETWEEN: Duration = Duration::from_millis(50);

/// Default maximum number of messages per batch.
pub const DEFAULT_BATCH_LIMIT: usize = 50;

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Source query, e.g. `-label:processed`.
    pub query: Option<String>,
    pub limit: usize,
    pub mode: ProcessingMode,
    pub mark_processed: bool,
    pub sleep_between: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            query: None,
            limit: DEFAULT_BATCH_LIMIT,
            mode: ProcessingMode::Llm,
            mark_processed: true,
            sleep_between: DEFAULT_SLEEP_BETWEEN,
        }
    }
}

/// What a batch run produced.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Processed records, in listing order.
    pub records: Vec<MessageRecord>,
    /// Ids returned by the source listing.
    pub listed: usize,
    /// Ids that could not be fetched.
    pub skipped: usize,
    /// Ids whose processed mark could not be set.
    pub mark_failures: usize,
}

/// Run one batch against `source`.
///
/// Fetched messages are archived, before triage, when a store is given.
pub async fn run_batch(
    source: &dyn MessageSource,
    processor: &MessageProcessor,
    store: Option<&TriageStore>,
    options: &BatchOptions,
) -> BatchReport {
    info!(
        source = source.name(),
        mode = options.mode.label(),
        query = options.query.as_deref().unwrap_or(""),
        limit = options.limit,
        "Starting batch"
    );

    let mut report = BatchReport::default();

    let ids = match source
        .list_ids(options.query.as_deref(), options.limit)
        .await
    {
        Ok(ids) => ids,
        Err(e) => {
            error!(source = source.name(), error = %e, "Failed to list messages");
            return report;
        }
    };
    report.listed = ids.len();

    let mut raw = Vec::with_capacity(ids.len());
    for (index, id) in ids.iter().enumerate() {
        let mut record = match source.fetch(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(id = %id, "Message not found, skipping");
                report.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to fetch message, skipping");
                report.skipped += 1;
                continue;
            }
        };

        record.body = record.body.into_structured();
        raw.push(record.clone());

        report
            .records
            .push(processor.process(record, options.mode).await);

        if options.mark_processed
            && let Err(e) = source.mark_processed(id).await
        {
            warn!(id = %id, error = %e, "Failed to mark message processed");
            report.mark_failures += 1;
        }

        if !options.sleep_between.is_zero() && index + 1 < ids.len() {
            tokio::time::sleep(options.sleep_between).await;
        }
    }

    if let Some(store) = store
        && let Err(e) = store.append_raw(&raw).await
    {
        warn!(error = %e, "Failed to archive raw messages");
    }

    info!(
        processed = report.records.len(),
        listed = report.listed,
        skipped = report.skipped,
        "Batch complete"
    );
    report
}
