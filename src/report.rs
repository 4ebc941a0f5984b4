use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::instance::{Action, TransitionRequest};

/// One transition request and its convergence wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub group: String,
    pub bucket: String,
    pub instance_ids: Vec<String>,
    pub attempts: u32,
    pub waited_ms: u64,
    pub wait_skipped: bool,
}

/// Structured audit record produced at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub action: Action,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    pub batches: Vec<BatchRecord>,
}

impl RunReport {
    pub fn new(action: Action, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            action,
            dry_run,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: 0,
            batches: Vec::new(),
        }
    }

    pub fn request(&self) -> TransitionRequest {
        TransitionRequest {
            action: self.action,
            dry_run: self.dry_run,
        }
    }

    pub fn record(&mut self, batch: BatchRecord) {
        self.batches.push(batch);
    }

    /// Stamp completion time and duration.
    pub fn finish(&mut self) {
        let now = Utc::now();
        self.duration_ms = (now - self.started_at).num_milliseconds();
        self.completed_at = Some(now);
    }

    pub fn instance_count(&self) -> usize {
        self.batches.iter().map(|b| b.instance_ids.len()).sum()
    }
}
