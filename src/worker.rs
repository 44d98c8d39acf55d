// src/worker.rs

use log::{debug, info, warn};
use serde::Deserialize;

use crate::client_ops::Submitter;
use crate::error::HarnessError;
use crate::message::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Done,
}

/// What a worker does after a failed submit. Failed sends are never retried
/// either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop this worker at the first failure. Siblings keep running.
    #[default]
    Abort,
    /// Skip the failed message and keep submitting.
    Continue,
}

/// Returned on join. Carries no per-message detail.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReport {
    pub worker: usize,
    pub attempted: usize,
    pub submitted: usize,
    pub failed: usize,
    pub first_error: Option<HarnessError>,
}

impl WorkerReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Submits the same envelope `count` times, one after another.
pub struct LoadWorker {
    id: usize,
    envelope: Envelope,
    count: usize,
    policy: FailurePolicy,
    state: WorkerState,
}

impl LoadWorker {
    pub fn new(id: usize, envelope: Envelope, count: usize, policy: FailurePolicy) -> Self {
        Self {
            id,
            envelope,
            count,
            policy,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn run(&mut self, submitter: &dyn Submitter) -> WorkerReport {
        self.state = WorkerState::Running;
        debug!("Worker {} running: {} messages", self.id, self.count);

        let mut report = WorkerReport {
            worker: self.id,
            attempted: 0,
            submitted: 0,
            failed: 0,
            first_error: None,
        };

        for n in 0..self.count {
            report.attempted += 1;
            match submitter.submit(&self.envelope) {
                Ok(()) => report.submitted += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Worker {} failed on message {}/{}: {:#}", self.id, n + 1, self.count, e);
                    report.first_error.get_or_insert_with(|| HarnessError::Submission {
                        worker: Some(self.id),
                        message: format!("{:#}", e),
                    });
                    if self.policy == FailurePolicy::Abort {
                        break;
                    }
                }
            }
        }

        self.state = WorkerState::Done;
        info!(
            "Worker {} done: {}/{} submitted, {} failed",
            self.id, report.submitted, self.count, report.failed
        );
        report
    }
}
