//! Sequential batch, submit and reconcile loop.
//!
//! One batch is fully submitted and reconciled before the next one is built.
//! Fatal errors return immediately; rejections only move the counters.

use human_bytes::human_bytes;
use logging_timer::timer;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::audit_builder::{AuditBuilder, What};
use crate::batcher::{Batch, Batcher};
use crate::debug_if;
use crate::error::Result;
use crate::es_client::{decode_bulk_response, EsClient};
use crate::models::bulk::BulkQuery;
use crate::models::record::Record;
use crate::reconciler::{reconcile, Rejection, SubmissionResult};
use crate::reporter::RunStats;

pub struct Pipeline {
    client: EsClient,
    index_name: String,
    batcher: Batcher,
    query: BulkQuery,
    audit: AuditBuilder,
    dry_run: bool,
    debug: bool,
}

impl Pipeline {
    pub fn new(client: EsClient, index_name: &str, batch_size: usize) -> Self {
        Self {
            client,
            index_name: index_name.to_string(),
            batcher: Batcher::new(index_name, batch_size),
            query: BulkQuery::default(),
            audit: AuditBuilder::disabled(),
            dry_run: false,
            debug: false,
        }
    }

    pub fn with_doc_type(mut self, doc_type: &str) -> Self {
        self.batcher = self.batcher.with_doc_type(doc_type);
        self
    }

    pub fn with_query(mut self, query: BulkQuery) -> Self {
        self.query = query;
        self
    }

    pub fn with_audit(mut self, audit: AuditBuilder) -> Self {
        self.audit = audit;
        self
    }

    /// Builds and logs batches without sending them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Dumps every payload at debug level.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub async fn run<T, I>(&mut self, records: I) -> Result<RunStats>
    where
        T: Serialize,
        I: IntoIterator<Item = Record<T>>,
    {
        self.batcher.reset();
        let mut records = records.into_iter().peekable();
        let total_batches = match records.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(self.batcher.batches_for(lower)),
            _ => None,
        };
        let mut stats = RunStats::new();

        while let Some(record) = records.next() {
            let last = records.peek().is_none();
            if let Some(batch) = self.batcher.accept(&record, last)? {
                self.process(batch, total_batches, &mut stats).await?;
            }
        }
        if let Some(batch) = self.batcher.finish() {
            self.process(batch, total_batches, &mut stats).await?;
        }

        Ok(stats)
    }

    async fn process(
        &mut self,
        batch: Batch,
        total_batches: Option<usize>,
        stats: &mut RunStats,
    ) -> Result<()> {
        let of_total = total_batches
            .map(|total| format!(" of {}", total))
            .unwrap_or_default();
        info!(
            "Batch {:<2}{} ({} documents, {})",
            batch.get_sequence(),
            of_total,
            batch.len(),
            human_bytes(batch.get_payload().len() as f64)
        );
        debug_if!(
            self.debug,
            "Payload of batch {}:\n{}",
            batch.get_sequence(),
            String::from_utf8_lossy(batch.get_payload())
        );

        if self.dry_run {
            return Ok(());
        }

        let batch_len = batch.len();
        let result = self.submit(batch).await?;
        let reconciliation = reconcile(&result);
        for rejection in &reconciliation.rejections {
            match rejection {
                Rejection::Batch { .. } => error!("{}", rejection),
                Rejection::Record { .. } => warn!("{}", rejection),
            }
        }
        stats.record(batch_len, &reconciliation);
        Ok(())
    }

    /// Sends one batch and decodes the answer. The batch is consumed by the request.
    pub async fn submit(&mut self, batch: Batch) -> Result<SubmissionResult> {
        let sequence = batch.get_sequence();
        if self.audit.is_enabled() {
            let body = String::from_utf8_lossy(batch.get_payload()).into_owned();
            self.audit.record(What::BulkRequest, Some(sequence), &body).await;
        }

        let (ids, payload) = batch.into_parts();
        let reply = {
            let _tmr = timer!("BULK_REQUEST", "batch {}", sequence);
            self.client.bulk(&self.index_name, &self.query, payload).await?
        };

        if self.audit.is_enabled() {
            let what = if reply.success {
                What::BulkResponseOk
            } else {
                What::BulkResponseErr
            };
            let body = String::from_utf8_lossy(&reply.body).into_owned();
            self.audit.record(what, Some(sequence), &body).await;
        }

        decode_bulk_response(&reply, &ids)
    }
}
