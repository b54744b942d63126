//! Batch partitioning, upload accounting, and final status derivation.

use crate::index::client::IndexWriter;
use crate::index::types::{BatchOutcome, BatchParams, IndexingReport, UploadResult};
use crate::model::{DocumentStatus, IndexRecord};
use crate::status::StatusReporter;
use crate::validate::validate_index_record;
use std::collections::{BTreeMap, BTreeSet};

/// Uploads validated records to the remote index in fixed-size batches and
/// reports the final per-document status.
///
/// Batches are processed strictly sequentially with a fixed pause between
/// consecutive uploads; the pause is the pipeline's only deliberate
/// backpressure against the index's write-capacity limits. Failures never
/// abort the run: a rejected record is counted and the run continues, and a
/// transport failure marks the whole batch failed with a shared reason.
/// Nothing is retried here; because the upsert is idempotent by record id,
/// callers can safely re-submit the same record set.
pub struct BatchIndexer<'a> {
    writer: &'a dyn IndexWriter,
    reporter: &'a dyn StatusReporter,
    params: BatchParams,
}

impl<'a> BatchIndexer<'a> {
    /// Build an indexer over the given writer and status sink.
    pub fn new(
        writer: &'a dyn IndexWriter,
        reporter: &'a dyn StatusReporter,
        params: BatchParams,
    ) -> Self {
        Self {
            writer,
            reporter,
            params,
        }
    }

    /// Upload every record and report the resulting document statuses.
    ///
    /// Records failing the index-record validator are withheld from upload
    /// and counted as failed with their defects as the reason; the validator
    /// is the gate on what gets persisted. Records sharing an id are
    /// ambiguous under merge-or-upload, so every copy of a duplicated id is
    /// withheld and counted as failed too. After the last batch, each
    /// distinct `document_id` is reported as `indexed` when none of its
    /// records failed, `partial_success` when some did, and `failed` when all
    /// did. Status writes are best effort and never fail the run.
    pub async fn index_records(&self, records: &[IndexRecord]) -> IndexingReport {
        if records.is_empty() {
            tracing::info!("No records to index");
            return IndexingReport::default();
        }

        let invalid = self.gate_records(records);
        let mut report = if invalid.is_empty() {
            self.upload_batches(records).await
        } else {
            let valid: Vec<IndexRecord> = records
                .iter()
                .filter(|record| !invalid.contains_key(&record.id))
                .cloned()
                .collect();
            let mut report = self.upload_batches(&valid).await;
            // Count every withheld copy, not map entries, so duplicated ids
            // keep `success + error == total` intact.
            report.error_count += records.len() - valid.len();
            report
        };
        report.invalid = invalid;

        self.report_statuses(records, &report).await;

        tracing::info!(
            succeeded = report.success_count,
            failed = report.error_count,
            batches = report.outcomes.len(),
            "Indexing complete"
        );
        report
    }

    /// Run the index-record validator over the input, returning the defect
    /// summary for every record id withheld from upload. Duplicated ids are
    /// withheld wholesale since which copy should win is undefined.
    fn gate_records(&self, records: &[IndexRecord]) -> BTreeMap<String, String> {
        let mut invalid = BTreeMap::new();
        let mut seen = BTreeSet::new();
        for record in records {
            if !seen.insert(record.id.as_str()) {
                invalid.insert(record.id.clone(), "duplicate record id in input".to_string());
                continue;
            }
            let verdict = validate_index_record(record, self.params.vector_dimension);
            if !verdict.passed {
                invalid.insert(record.id.clone(), verdict.defects.join("; "));
            }
        }
        if !invalid.is_empty() {
            tracing::warn!(
                withheld = invalid.len(),
                total = records.len(),
                "Records failed index-record validation and will not be uploaded"
            );
        }
        invalid
    }

    async fn upload_batches(&self, records: &[IndexRecord]) -> IndexingReport {
        let batch_size = self.params.batch_size.max(1);
        let total_batches = records.len().div_ceil(batch_size);
        let mut report = IndexingReport::default();

        for (batch_index, batch) in records.chunks(batch_size).enumerate() {
            let outcome = match self.writer.merge_or_upload(batch).await {
                Ok(results) => classify_batch(batch_index, batch, &results),
                Err(error) => {
                    let reason = error.to_string();
                    tracing::error!(
                        batch = batch_index + 1,
                        total_batches,
                        error = %reason,
                        "Batch upload failed; marking every record in the batch failed"
                    );
                    let mut outcome = BatchOutcome::new(batch_index);
                    for record in batch {
                        outcome.failed.insert(record.id.clone(), reason.clone());
                    }
                    outcome
                }
            };

            for (key, reason) in &outcome.failed {
                tracing::debug!(key, reason, "Record failed to index");
            }
            tracing::info!(
                batch = batch_index + 1,
                total_batches,
                succeeded = outcome.succeeded_ids.len(),
                failed = outcome.failed.len(),
                "Batch complete"
            );

            report.success_count += outcome.succeeded_ids.len();
            report.error_count += outcome.failed.len();
            report.outcomes.push(outcome);

            if batch_index + 1 < total_batches {
                tokio::time::sleep(self.params.batch_delay).await;
            }
        }

        report
    }

    async fn report_statuses(&self, records: &[IndexRecord], report: &IndexingReport) {
        let document_of: BTreeMap<&str, &str> = records
            .iter()
            .map(|record| (record.id.as_str(), record.document_id.as_str()))
            .collect();

        // (succeeded, failed) record counts per document.
        let mut per_document: BTreeMap<&str, (usize, usize)> = records
            .iter()
            .map(|record| (record.document_id.as_str(), (0, 0)))
            .collect();

        for outcome in &report.outcomes {
            for id in &outcome.succeeded_ids {
                if let Some(document_id) = document_of.get(id.as_str()) {
                    per_document
                        .entry(document_id)
                        .and_modify(|counts| counts.0 += 1);
                }
            }
            for id in outcome.failed.keys() {
                if let Some(document_id) = document_of.get(id.as_str()) {
                    per_document
                        .entry(document_id)
                        .and_modify(|counts| counts.1 += 1);
                }
            }
        }
        // Per input record, so every copy of a duplicated id counts.
        for record in records {
            if report.invalid.contains_key(&record.id) {
                per_document
                    .entry(record.document_id.as_str())
                    .and_modify(|counts| counts.1 += 1);
            }
        }

        let mut indexed = Vec::new();
        let mut partial = Vec::new();
        let mut failed = Vec::new();
        let mut partial_failures = 0usize;
        let mut failed_failures = 0usize;

        for (document_id, (succeeded, failures)) in &per_document {
            let document_id = document_id.to_string();
            if *failures == 0 {
                indexed.push(document_id);
            } else if *succeeded > 0 {
                partial.push(document_id);
                partial_failures += failures;
            } else {
                failed.push(document_id);
                failed_failures += failures;
            }
        }

        self.report(&indexed, DocumentStatus::Indexed, None).await;
        self.report(
            &partial,
            DocumentStatus::PartialSuccess,
            Some(&format!("{partial_failures} chunks failed to index")),
        )
        .await;
        self.report(
            &failed,
            DocumentStatus::Failed,
            Some(&format!("{failed_failures} chunks failed to index")),
        )
        .await;
    }

    /// Best-effort status write shared by every exit path.
    pub(crate) async fn report(
        &self,
        document_ids: &[String],
        status: DocumentStatus,
        error: Option<&str>,
    ) {
        if document_ids.is_empty() {
            return;
        }
        if let Err(err) = self.reporter.set_status(document_ids, status, error).await {
            tracing::warn!(
                error = %err,
                status = %status,
                documents = document_ids.len(),
                "Best-effort status update failed"
            );
        }
    }
}

/// Pair every record of a batch with its result from the index response.
///
/// A record the response does not mention is counted as failed rather than
/// silently dropped, which keeps `success + error == total` intact.
fn classify_batch(
    batch_index: usize,
    batch: &[IndexRecord],
    results: &[UploadResult],
) -> BatchOutcome {
    let by_key: BTreeMap<&str, &UploadResult> = results
        .iter()
        .map(|result| (result.key.as_str(), result))
        .collect();

    let mut outcome = BatchOutcome::new(batch_index);
    for record in batch {
        match by_key.get(record.id.as_str()) {
            Some(result) if result.succeeded => {
                outcome.succeeded_ids.insert(record.id.clone());
            }
            Some(result) => {
                outcome.failed.insert(
                    record.id.clone(),
                    result
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "rejected by the index".to_string()),
                );
            }
            None => {
                outcome.failed.insert(
                    record.id.clone(),
                    "no result returned for record".to_string(),
                );
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::{IndexError, RunStatus};
    use crate::status::test_support::{FailingReporter, RecordingReporter};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Writer with scripted per-batch and per-record behavior.
    #[derive(Default)]
    struct ScriptedWriter {
        calls: AtomicUsize,
        fail_batches: BTreeSet<usize>,
        reject_ids: BTreeSet<String>,
    }

    #[async_trait]
    impl IndexWriter for ScriptedWriter {
        async fn merge_or_upload(
            &self,
            records: &[IndexRecord],
        ) -> Result<Vec<UploadResult>, IndexError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_batches.contains(&call) {
                return Err(IndexError::UnexpectedStatus {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: "throttled".into(),
                });
            }
            Ok(records
                .iter()
                .map(|record| UploadResult {
                    key: record.id.clone(),
                    succeeded: !self.reject_ids.contains(&record.id),
                    error_message: self
                        .reject_ids
                        .contains(&record.id)
                        .then(|| "rejected".to_string()),
                })
                .collect())
        }
    }

    fn record(document_id: &str, chunk_index: usize) -> IndexRecord {
        IndexRecord {
            id: format!("{document_id}_chunk_{chunk_index}"),
            content: "chunk".into(),
            content_vector: vec![0.5; 4],
            document_id: document_id.into(),
            document_name: format!("{document_id}.pdf"),
            document_url: format!("https://example.test/{document_id}.pdf"),
            page_number: 1,
            chunk_index,
            metadata: "{}".into(),
            organization_id: "org".into(),
            folder_id: "folder".into(),
        }
    }

    fn params(batch_size: usize) -> BatchParams {
        BatchParams {
            batch_size,
            batch_delay: Duration::from_millis(500),
            vector_dimension: 4,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_middle_batch_yields_partial_success_accounting() {
        // 250 records over two documents, B=100: batches of 100/100/50.
        let records: Vec<IndexRecord> = (0..250)
            .map(|i| record(if i < 125 { "doc-a" } else { "doc-b" }, i))
            .collect();
        let writer = ScriptedWriter {
            fail_batches: BTreeSet::from([1]),
            ..ScriptedWriter::default()
        };
        let reporter = RecordingReporter::default();
        let indexer = BatchIndexer::new(&writer, &reporter, params(100));

        let report = indexer.index_records(&records).await;

        assert_eq!(report.success_count, 150);
        assert_eq!(report.error_count, 100);
        assert_eq!(report.status(), RunStatus::PartialSuccess);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.outcomes[1].failed.len(), 100);
        // Shared transport reason on every record of the failed batch.
        assert!(
            report.outcomes[1]
                .failed
                .values()
                .all(|reason| reason.contains("throttled"))
        );

        // Both documents lost some records but kept others.
        let updates = reporter.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (ids, status, error) = &updates[0];
        assert_eq!(ids, &["doc-a".to_string(), "doc-b".to_string()]);
        assert_eq!(*status, DocumentStatus::PartialSuccess);
        assert_eq!(error.as_deref(), Some("100 chunks failed to index"));
    }

    #[tokio::test(start_paused = true)]
    async fn clean_run_reports_indexed_for_every_document() {
        let records: Vec<IndexRecord> = (0..7).map(|i| record("doc-a", i)).collect();
        let writer = ScriptedWriter::default();
        let reporter = RecordingReporter::default();
        let indexer = BatchIndexer::new(&writer, &reporter, params(3));

        let report = indexer.index_records(&records).await;

        assert_eq!(report.success_count, 7);
        assert_eq!(report.error_count, 0);
        assert_eq!(report.status(), RunStatus::Success);

        let updates = reporter.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1, DocumentStatus::Indexed);
        assert_eq!(updates[0].2, None);
    }

    #[tokio::test(start_paused = true)]
    async fn per_document_statuses_follow_record_failures() {
        // doc-a fully succeeds, doc-b fully fails, doc-c is mixed.
        let mut records = vec![record("doc-a", 0), record("doc-a", 1)];
        records.extend([record("doc-b", 0), record("doc-b", 1)]);
        records.extend([record("doc-c", 0), record("doc-c", 1)]);
        let writer = ScriptedWriter {
            reject_ids: BTreeSet::from([
                "doc-b_chunk_0".to_string(),
                "doc-b_chunk_1".to_string(),
                "doc-c_chunk_1".to_string(),
            ]),
            ..ScriptedWriter::default()
        };
        let reporter = RecordingReporter::default();
        let indexer = BatchIndexer::new(&writer, &reporter, params(100));

        let report = indexer.index_records(&records).await;
        assert_eq!(report.success_count + report.error_count, records.len());

        let updates = reporter.updates.lock().unwrap();
        let by_status: BTreeMap<DocumentStatus, Vec<String>> = updates
            .iter()
            .map(|(ids, status, _)| (*status, ids.clone()))
            .collect();
        assert_eq!(by_status[&DocumentStatus::Indexed], vec!["doc-a"]);
        assert_eq!(by_status[&DocumentStatus::PartialSuccess], vec!["doc-c"]);
        assert_eq!(by_status[&DocumentStatus::Failed], vec!["doc-b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn re_indexing_the_same_records_yields_the_same_succeeded_set() {
        let records: Vec<IndexRecord> = (0..10).map(|i| record("doc-a", i)).collect();
        let writer = ScriptedWriter {
            reject_ids: BTreeSet::from(["doc-a_chunk_3".to_string()]),
            ..ScriptedWriter::default()
        };
        let reporter = RecordingReporter::default();
        let indexer = BatchIndexer::new(&writer, &reporter, params(4));

        let first = indexer.index_records(&records).await;
        let second = indexer.index_records(&records).await;
        assert_eq!(first.succeeded_ids(), second.succeeded_ids());
        assert_eq!(first.succeeded_ids().len(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_runs_between_batches_but_not_after_the_last() {
        let records: Vec<IndexRecord> = (0..9).map(|i| record("doc-a", i)).collect();
        let writer = ScriptedWriter::default();
        let reporter = RecordingReporter::default();
        let indexer = BatchIndexer::new(&writer, &reporter, params(3));

        let started = tokio::time::Instant::now();
        indexer.index_records(&records).await;
        // 3 batches, 2 inter-batch pauses of 500ms under paused time.
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn reporter_failures_do_not_fail_the_run() {
        let records = vec![record("doc-a", 0)];
        let writer = ScriptedWriter::default();
        let indexer = BatchIndexer::new(&writer, &FailingReporter, params(10));

        let report = indexer.index_records(&records).await;
        assert_eq!(report.success_count, 1);
        assert_eq!(report.status(), RunStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_touches_neither_writer_nor_reporter() {
        let writer = ScriptedWriter::default();
        let reporter = RecordingReporter::default();
        let indexer = BatchIndexer::new(&writer, &reporter, params(10));

        let report = indexer.index_records(&[]).await;
        assert_eq!(report.success_count, 0);
        assert_eq!(report.error_count, 0);
        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);
        assert!(reporter.updates.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_records_are_withheld_and_counted_as_failures() {
        let mut records: Vec<IndexRecord> = (0..3).map(|i| record("doc-a", i)).collect();
        records[1].content_vector = vec![0.5; 3];
        let writer = ScriptedWriter::default();
        let reporter = RecordingReporter::default();
        let indexer = BatchIndexer::new(&writer, &reporter, params(10));

        let report = indexer.index_records(&records).await;

        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert!(report.invalid.contains_key("doc-a_chunk_1"));
        assert!(report.invalid["doc-a_chunk_1"].contains("dims"));
        // The invalid record never reached the writer's batches.
        assert!(
            report
                .outcomes
                .iter()
                .all(|outcome| !outcome.failed.contains_key("doc-a_chunk_1"))
        );

        let updates = reporter.updates.lock().unwrap();
        assert_eq!(updates[0].1, DocumentStatus::PartialSuccess);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_record_ids_are_withheld_and_counted_per_copy() {
        let records = vec![record("doc-a", 0), record("doc-a", 0), record("doc-a", 1)];
        let writer = ScriptedWriter::default();
        let reporter = RecordingReporter::default();
        let indexer = BatchIndexer::new(&writer, &reporter, params(10));

        let report = indexer.index_records(&records).await;

        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 2);
        assert_eq!(report.success_count + report.error_count, records.len());
        assert!(report.invalid["doc-a_chunk_0"].contains("duplicate"));
        // No copy of the ambiguous id reached the index.
        assert!(
            report
                .outcomes
                .iter()
                .all(|outcome| !outcome.succeeded_ids.contains("doc-a_chunk_0"))
        );

        let updates = reporter.updates.lock().unwrap();
        assert_eq!(updates[0].1, DocumentStatus::PartialSuccess);
        assert_eq!(updates[0].2.as_deref(), Some("2 chunks failed to index"));
    }
}
