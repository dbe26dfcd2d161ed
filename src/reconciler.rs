//! Turns a bulk response into indexed/failed counts and rejection diagnostics.

use std::fmt;

use crate::models::bulk::ErrorCause;

/// Highest item status Elasticsearch uses for a written document (200 updated, 201 created).
pub const MAX_SUCCESS_STATUS: u16 = 201;

/// Decoded answer of the bulk endpoint for one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    /// The whole request was rejected; every record of the batch failed.
    WholeFailure {
        status: u16,
        error: ErrorCause,
        records: usize,
    },
    /// One outcome per record, in submission order.
    Itemized(Vec<RecordOutcome>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub id: String,
    pub status: u16,
    pub result: Option<String>,
    pub error: Option<ErrorCause>,
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        self.status <= MAX_SUCCESS_STATUS
    }
}

/// A rejection the run survives.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Batch {
        status: u16,
        kind: String,
        reason: String,
        records: usize,
    },
    Record {
        id: String,
        status: u16,
        kind: String,
        reason: String,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Batch {
                status,
                kind,
                reason,
                records,
            } => write!(
                f,
                "Error: [{}] {}: {} ({} documents rejected)",
                status, kind, reason, records
            ),
            Rejection::Record {
                id,
                status,
                kind,
                reason,
            } => write!(f, "Error: documentID={:<3} [{}] {}: {}", id, status, kind, reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub indexed: u64,
    pub failed: u64,
    pub rejections: Vec<Rejection>,
}

fn describe(error: Option<&ErrorCause>) -> (String, String) {
    match error {
        Some(cause) => (
            cause.kind.clone(),
            cause.deepest_reason().unwrap_or("unknown reason").to_string(),
        ),
        None => (String::default(), "unknown reason".to_string()),
    }
}

/// Classifies every record of a submission result. Pure; callers fold the
/// result into [`crate::reporter::RunStats`].
pub fn reconcile(result: &SubmissionResult) -> Reconciliation {
    match result {
        SubmissionResult::WholeFailure {
            status,
            error,
            records,
        } => {
            let (kind, reason) = describe(Some(error));
            Reconciliation {
                indexed: 0,
                failed: *records as u64,
                rejections: vec![Rejection::Batch {
                    status: *status,
                    kind,
                    reason,
                    records: *records,
                }],
            }
        }
        SubmissionResult::Itemized(outcomes) => {
            let mut reconciliation = Reconciliation::default();
            for outcome in outcomes {
                if outcome.is_success() {
                    reconciliation.indexed += 1;
                } else {
                    reconciliation.failed += 1;
                    let (kind, reason) = describe(outcome.error.as_ref());
                    reconciliation.rejections.push(Rejection::Record {
                        id: outcome.id.clone(),
                        status: outcome.status,
                        kind,
                        reason,
                    });
                }
            }
            reconciliation
        }
    }
}
