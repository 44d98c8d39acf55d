// src/runner.rs
//
// Orchestrates a stress run: submit (sequentially or from worker threads),
// wait for every submission to finish, then drain and verify the mailbox.

use eyre::Result;
use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::thread;

use crate::client_ops::{MailboxInspector, Submitter};
use crate::error::{HarnessError, VerificationFailure};
use crate::message::{Envelope, RetrievedMessage};
use crate::worker::{FailurePolicy, LoadWorker, WorkerReport};

/// How the classification marker is looked for in a retrieved message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerMatch {
    /// Substring anywhere in the message text.
    #[default]
    Contains,
    /// A header with the marker as its name.
    Header,
}

impl MarkerMatch {
    pub fn matches(&self, msg: &RetrievedMessage, marker: &str) -> bool {
        match self {
            MarkerMatch::Contains => msg.contains(marker),
            MarkerMatch::Header => msg.has_header(marker),
        }
    }
}

/// Run-scoped parameters. Fixed before any worker starts.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub envelope: Envelope,
    pub marker: String,
    pub marker_match: MarkerMatch,
    pub failure_policy: FailurePolicy,
    /// Fail the concurrent scenario with the first worker error instead of
    /// letting the count check report the shortfall.
    pub propagate_worker_errors: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            envelope: Envelope::new("test@test.com", "test@test.com", "test", "test"),
            marker: "X-Spam-Status".to_string(),
            marker_match: MarkerMatch::Contains,
            failure_policy: FailurePolicy::Abort,
            propagate_worker_errors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub expected: usize,
    pub popped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    /// Messages the scenario set out to submit.
    pub planned: usize,
    /// Empty for the sequential scenario.
    pub workers: Vec<WorkerReport>,
    pub verification: VerificationReport,
}

pub struct StressRunner<I: MailboxInspector> {
    submitter: Arc<dyn Submitter>,
    inspector: I,
    settings: RunSettings,
}

impl<I: MailboxInspector> StressRunner<I> {
    pub fn new(submitter: Arc<dyn Submitter>, inspector: I, settings: RunSettings) -> Self {
        Self {
            submitter,
            inspector,
            settings,
        }
    }

    pub fn inspector_mut(&mut self) -> &mut I {
        &mut self.inspector
    }

    /// Precondition: the dedicated account must start out empty so the count
    /// check is not polluted by unrelated mail.
    pub fn ensure_empty(&mut self) -> Result<()> {
        let pending = self.inspector.count()?;
        if pending != 0 {
            return Err(HarnessError::Precondition(format!(
                "mailbox already holds {} messages; a fresh account is required",
                pending
            ))
            .into());
        }
        Ok(())
    }

    /// Submit `count` messages on the calling thread, then verify.
    pub fn run_sequential(&mut self, count: usize) -> Result<ScenarioReport> {
        info!("→ Sequential scenario: {} messages", count);

        for n in 0..count {
            self.submitter.submit(&self.settings.envelope).map_err(|e| HarnessError::Submission {
                worker: None,
                message: format!("message {}/{}: {:#}", n + 1, count, e),
            })?;
        }
        debug!("All {} sequential submissions accepted", count);

        let verification = self.verify(count)?;
        Ok(ScenarioReport {
            planned: count,
            workers: Vec::new(),
            verification,
        })
    }

    /// Start `workers` threads each submitting `per_worker` messages, join
    /// every one of them, then verify `workers * per_worker` messages.
    pub fn run_concurrent(&mut self, workers: usize, per_worker: usize) -> Result<ScenarioReport> {
        let planned = workers.checked_mul(per_worker).ok_or_else(|| {
            HarnessError::Precondition(format!(
                "{} workers × {} messages overflows the message count",
                workers, per_worker
            ))
        })?;
        info!(
            "→ Concurrent scenario: {} workers × {} messages = {}",
            workers, per_worker, planned
        );

        let submitter: &dyn Submitter = self.submitter.as_ref();
        let joined: Vec<thread::Result<WorkerReport>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|id| {
                    let mut worker = LoadWorker::new(
                        id,
                        self.settings.envelope.clone(),
                        per_worker,
                        self.settings.failure_policy,
                    );
                    scope.spawn(move || worker.run(submitter))
                })
                .collect();

            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut reports = Vec::with_capacity(workers);
        for (id, result) in joined.into_iter().enumerate() {
            match result {
                Ok(report) => reports.push(report),
                Err(_) => {
                    return Err(HarnessError::Submission {
                        worker: Some(id),
                        message: "worker thread panicked".to_string(),
                    }
                    .into())
                }
            }
        }
        info!("All {} workers finished", workers);

        if let Some(err) = reports.iter().find_map(|r| r.first_error.clone()) {
            if self.settings.propagate_worker_errors {
                return Err(err.into());
            }
            let failed: usize = reports.iter().map(|r| r.failed).sum();
            warn!("{} submissions failed across workers; verifying anyway", failed);
        }

        let verification = self.verify(planned)?;
        Ok(ScenarioReport {
            planned,
            workers: reports,
            verification,
        })
    }

    /// Check the pending count, then pop exactly `expected` messages oldest
    /// first, each of which must carry the marker. Stops at the first failure.
    pub fn verify(&mut self, expected: usize) -> Result<VerificationReport> {
        let actual = self.inspector.count()?;
        if actual != expected {
            return Err(HarnessError::from(VerificationFailure::CountMismatch { expected, actual }).into());
        }
        debug!("Mailbox holds the expected {} messages", expected);

        let marker = self.settings.marker.as_str();
        for index in 1..=expected {
            let msg = RetrievedMessage::new(self.inspector.pop_oldest_text()?);
            if !self.settings.marker_match.matches(&msg, marker) {
                return Err(HarnessError::from(VerificationFailure::MarkerMissing {
                    index,
                    marker: marker.to_string(),
                    content: msg.text,
                })
                .into());
            }
            debug!("Verified message {}/{} (subject={:?})", index, expected, msg.subject());
        }

        info!("✅ Verified {} messages carry '{}'", expected, marker);
        Ok(VerificationReport {
            expected,
            popped: expected,
        })
    }
}
