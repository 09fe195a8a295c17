//! The ingestion loop: one grounded extraction call per transcript.
//!
//! Partial-failure semantics: a transcript that yields a bad completion is
//! recorded with its specific error and skipped; it never aborts the batch.
//! Only a source failure (the batch cannot be acquired at all) stops the run.

use casebook_ingest::{normalize_transcript, TranscriptSource};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::pipeline::{Pipeline, PipelineError};

/// What happened to one transcript, indexed by its position in the batch.
#[derive(Debug)]
pub enum TranscriptOutcome {
    Stored { index: usize, records: usize },
    Failed { index: usize, error: PipelineError },
}

/// Outcome of one ingestion batch.
#[derive(Debug)]
pub struct IngestReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<TranscriptOutcome>,
}

impl IngestReport {
    pub fn stored_transcripts(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TranscriptOutcome::Stored { .. }))
            .count()
    }

    pub fn stored_records(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                TranscriptOutcome::Stored { records, .. } => *records,
                TranscriptOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &PipelineError)> {
        self.outcomes.iter().filter_map(|o| match o {
            TranscriptOutcome::Failed { index, error } => Some((*index, error)),
            TranscriptOutcome::Stored { .. } => None,
        })
    }
}

/// Drives the extraction path across a bounded batch of raw transcripts.
pub struct IngestionLoop<'a> {
    pipeline: &'a Pipeline,
    batch_size: usize,
}

impl<'a> IngestionLoop<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self {
            pipeline,
            batch_size: 10,
        }
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    /// Drain one batch from the source, collecting per-transcript outcomes.
    pub async fn run(&self, source: &mut dyn TranscriptSource) -> anyhow::Result<IngestReport> {
        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let transcripts = source.next_batch(self.batch_size)?;
        tracing::info!(%session_id, transcripts = transcripts.len(), "ingestion batch started");

        let mut outcomes = Vec::with_capacity(transcripts.len());
        for (index, raw) in transcripts.iter().enumerate() {
            let transcript = normalize_transcript(raw);
            match self.pipeline.extract(&transcript).await {
                Ok(records) => {
                    tracing::debug!(index, records, "transcript stored");
                    outcomes.push(TranscriptOutcome::Stored { index, records });
                }
                Err(error) => {
                    tracing::warn!(index, %error, "transcript failed");
                    outcomes.push(TranscriptOutcome::Failed { index, error });
                }
            }
        }

        let report = IngestReport {
            session_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        tracing::info!(
            %session_id,
            stored = report.stored_transcripts(),
            failed = report.failures().count(),
            "ingestion batch finished"
        );
        Ok(report)
    }
}
