// Run Report - diagnostics for a pipeline run
// Skips and name misses are recoverable data, never errors; the report is
// what makes them visible for manual follow-up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// SKIP RECORDS
// ============================================================================

/// A record excluded from output, with the stage that dropped it and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipRecord {
    pub entity_id: String,
    pub stage: String,
    pub reason: String,
}

impl SkipRecord {
    pub fn new(entity_id: &str, stage: &str, reason: impl Into<String>) -> Self {
        SkipRecord {
            entity_id: entity_id.to_string(),
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// STAGE COUNTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageCounts {
    pub documents_read: usize,
    pub facts_extracted: usize,
    pub facts_skipped: usize,
    pub persons_emitted: usize,
    pub persons_skipped: usize,
    pub co_memberships: usize,
    pub names_unresolved: usize,
}

// ============================================================================
// RUN REPORT
// ============================================================================

/// Diagnostics emitted alongside every pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run ID
    pub run_id: String,

    /// When this run finished
    pub generated_at: DateTime<Utc>,

    pub counts: StageCounts,

    /// Records dropped on the way, with reasons
    pub skipped: Vec<SkipRecord>,

    /// Entity IDs with no localized name in any provider, one per entity,
    /// for manual follow-up
    pub name_misses: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            counts: StageCounts::default(),
            skipped: Vec::new(),
            name_misses: Vec::new(),
        }
    }

    /// One-line summary for CLI output
    pub fn summary(&self) -> String {
        format!(
            "{} facts from {} documents, {} persons ({} skipped), {} co-memberships, {} unresolved names",
            self.counts.facts_extracted,
            self.counts.documents_read,
            self.counts.persons_emitted,
            self.counts.persons_skipped,
            self.counts.co_memberships,
            self.counts.names_unresolved,
        )
    }

    pub fn has_skips(&self) -> bool {
        !self.skipped.is_empty()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
