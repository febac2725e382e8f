//! Batch runner: pending records fan out over a fixed pool of workers.
//!
//! Each worker owns a disjoint slice and processes it sequentially. Finished
//! records flow back over a channel and are persisted here, so the store has
//! a single writer. The quota tracker inside the engine is the only state the
//! workers share.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{Instrument, info, info_span, instrument, warn};

use leadscout_shared::{BusinessRecord, ProcessingStatus, Result, ReviewStatus};
use leadscout_storage::Storage;

use crate::pipeline::Engine;

/// Outcome counts for one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub fetched: usize,
    pub processed: usize,
    pub approved: usize,
    pub pending_review: usize,
    pub rejected: usize,
    pub failed: usize,
    /// A worker stopped early because the search quota ran out.
    pub quota_halted: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchSummary {
    fn tally(&mut self, record: &BusinessRecord) {
        self.processed += 1;
        match (record.processing_status(), record.review_status()) {
            (ProcessingStatus::Failed, _) => self.failed += 1,
            (_, Some(ReviewStatus::ApprovedDownload)) => self.approved += 1,
            (_, Some(ReviewStatus::PendingReview)) => self.pending_review += 1,
            (_, Some(ReviewStatus::Rejected)) => self.rejected += 1,
            _ => {}
        }
    }
}

/// Progress callback for batch runs.
pub trait BatchProgress: Send + Sync {
    /// Called once with the number of records fetched.
    fn started(&self, total: usize);
    /// Called after each record is persisted.
    fn record_done(&self, record: &BusinessRecord, done: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn started(&self, _total: usize) {}
    fn record_done(&self, _record: &BusinessRecord, _done: usize, _total: usize) {}
}

/// Process up to `limit` pending records with `workers` concurrent workers.
#[instrument(skip_all, fields(limit = limit, workers = workers))]
pub async fn run_batch(
    engine: Arc<Engine>,
    storage: &Storage,
    limit: u32,
    workers: usize,
    progress: &dyn BatchProgress,
) -> Result<BatchSummary> {
    let start = Instant::now();
    let records = storage.fetch_pending(limit).await?;
    let total = records.len();
    let mut summary = BatchSummary {
        fetched: total,
        ..BatchSummary::default()
    };
    progress.started(total);
    if total == 0 {
        info!("no pending records");
        return Ok(summary);
    }

    let workers = workers.clamp(1, total);
    let slice_len = total.div_ceil(workers);
    info!(total, workers, slice_len, "starting batch");

    let (tx, mut rx) = mpsc::channel::<BusinessRecord>(total);
    let mut handles = Vec::with_capacity(workers);
    let mut pending = records.into_iter();

    for worker in 0..workers {
        let slice: Vec<BusinessRecord> = pending.by_ref().take(slice_len).collect();
        if slice.is_empty() {
            break;
        }
        let engine = Arc::clone(&engine);
        let tx = tx.clone();
        let handle = tokio::spawn(
            async move { process_slice(engine, slice, tx).await }
                .instrument(info_span!("worker", worker)),
        );
        handles.push(handle);
    }
    drop(tx);

    while let Some(record) = rx.recv().await {
        storage.update_record(&record).await?;
        summary.tally(&record);
        progress.record_done(&record, summary.processed, total);
    }

    for handle in handles {
        match handle.await {
            Ok(halted) => summary.quota_halted |= halted,
            Err(e) => warn!(error = %e, "worker task panicked"),
        }
    }

    summary.elapsed = start.elapsed();
    info!(
        processed = summary.processed,
        approved = summary.approved,
        pending_review = summary.pending_review,
        rejected = summary.rejected,
        failed = summary.failed,
        quota_halted = summary.quota_halted,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "batch finished"
    );
    Ok(summary)
}

/// Returns whether the slice was cut short by an exhausted quota.
async fn process_slice(
    engine: Arc<Engine>,
    slice: Vec<BusinessRecord>,
    tx: mpsc::Sender<BusinessRecord>,
) -> bool {
    let len = slice.len();
    for (i, mut record) in slice.into_iter().enumerate() {
        let result = engine.process_record(&mut record).await;
        let halted = matches!(&result, Err(e) if e.is_quota_exceeded());

        match &result {
            Err(e) if !halted => {
                warn!(record_id = record.id, error = %e, "record skipped");
                continue;
            }
            _ => {}
        }
        if tx.send(record).await.is_err() {
            return false;
        }
        if halted {
            warn!(left_pending = len - i - 1, "search quota exhausted, worker stopping");
            return true;
        }
    }
    false
}
