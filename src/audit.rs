//! Mutation-audit surface for the ORM layer.
//!
//! The ORM collaborator calls back into this crate with the outcome of every
//! entity mutation; field values arrive already masked. This crate only
//! defines the record and the callback seam, plus two ready-made consumers:
//! one that logs and one that collects for tests.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// Outcome of one ORM mutation, with field data already masked upstream.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    /// Entity/schema name the mutation targeted.
    pub entity: String,
    /// Operation kind (create, update, delete).
    pub op: String,
    /// Masked fields touched by the mutation.
    pub fields: Vec<String>,
    pub elapsed_ms: u64,
    /// Empty when the mutation succeeded.
    pub error: String,
}

impl MutationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_empty()
    }
}

/// Callback consumed by the ORM hook.
pub type MutationAudit = Arc<dyn Fn(&MutationOutcome) + Send + Sync>;

/// Audit consumer that emits one structured event per mutation.
pub fn logging_audit() -> MutationAudit {
    Arc::new(|outcome| {
        if outcome.succeeded() {
            tracing::info!(
                category = "entStats",
                entity = %outcome.entity,
                op = %outcome.op,
                fields = ?outcome.fields,
                "use" = %format!("{}ms", outcome.elapsed_ms),
                "entity mutation"
            );
        } else {
            tracing::error!(
                category = "entStats",
                entity = %outcome.entity,
                op = %outcome.op,
                error = %outcome.error,
                "entity mutation failed"
            );
        }
    })
}

/// Audit consumer that records outcomes in memory, for tests and simulation.
#[derive(Default)]
pub struct CollectingAudit {
    outcomes: Mutex<Vec<MutationOutcome>>,
}

impl CollectingAudit {
    pub fn new() -> Arc<Self> {
        Arc::new(CollectingAudit::default())
    }

    pub fn record(&self, outcome: &MutationOutcome) {
        self.outcomes.lock().push(outcome.clone());
    }

    pub fn outcomes(&self) -> Vec<MutationOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.lock().iter().filter(|o| !o.succeeded()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(error: &str) -> MutationOutcome {
        MutationOutcome {
            entity: "user".to_string(),
            op: "create".to_string(),
            fields: vec!["account".to_string(), "password".to_string()],
            elapsed_ms: 3,
            error: error.to_string(),
        }
    }

    #[test]
    fn test_collecting_audit_records_outcomes() {
        let audit = CollectingAudit::new();
        audit.record(&outcome(""));
        audit.record(&outcome("constraint violation"));

        assert_eq!(audit.outcomes().len(), 2);
        assert_eq!(audit.failures(), 1);
    }

    #[test]
    fn test_callback_seam() {
        let collector = CollectingAudit::new();
        let sink = Arc::clone(&collector);
        let callback: MutationAudit = Arc::new(move |o| sink.record(o));

        callback(&outcome(""));
        assert_eq!(collector.outcomes().len(), 1);
        assert!(collector.outcomes()[0].succeeded());
    }
}
