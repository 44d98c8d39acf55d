// tests/harness/mock_client.rs
//
// Mock submission and retrieval channels.
// Both operate against a shared VirtualMailbox and record what they did.

use eyre::{eyre, Result};
use spam_stress::message::Envelope;
use spam_stress::{Clock, HarnessError, MailboxInspector, Submitter, VerificationFailure};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use crate::harness::virtual_clock::VirtualClock;
use crate::harness::virtual_mailbox::VirtualMailbox;

/// Header the simulated classifier prepends to every message it scores.
pub const CLASSIFICATION_HEADER: &str =
    "X-Spam-Status: No, score=0.0 required=5.0 tests=NONE autolearn=no\r\n";

/// Server misbehaviour to inject, keyed on the 1-based submit call number.
/// `*_every: Some(k)` fires on every k-th call.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Accepted but never delivered.
    pub drop_every: Option<usize>,
    /// Delivered twice.
    pub duplicate_every: Option<usize>,
    /// Delivered without being classified.
    pub unmarked_every: Option<usize>,
    /// Refused at submission time; nothing is delivered.
    pub reject_calls: Vec<usize>,
}

impl FaultPlan {
    fn fires(every: Option<usize>, call: usize) -> bool {
        matches!(every, Some(k) if k > 0 && call % k == 0)
    }
}

/// Recorded action types for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedAction {
    /// A submitted message landed in the mailbox.
    Delivered { call: usize, uid: u32 },
    /// A submission was accepted but lost.
    Dropped { call: usize },
    /// A submission was refused.
    Rejected { call: usize },
    /// The inspector asked for the pending count.
    Count { pending: usize },
    /// The inspector removed a message.
    Pop { uid: u32 },
}

impl RecordedAction {
    pub fn is_delivery(&self) -> bool {
        matches!(self, RecordedAction::Delivered { .. })
    }

    pub fn is_retrieval(&self) -> bool {
        matches!(self, RecordedAction::Count { .. } | RecordedAction::Pop { .. })
    }
}

pub type ActionLog = Arc<RwLock<Vec<RecordedAction>>>;

/// Submitter that plays the server: classifies, then delivers into the mailbox.
pub struct MockSubmitter {
    mailbox: Arc<RwLock<VirtualMailbox>>,
    actions: ActionLog,
    clock: VirtualClock,
    faults: FaultPlan,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSubmitter {
    pub fn new(mailbox: Arc<RwLock<VirtualMailbox>>, actions: ActionLog, clock: VirtualClock) -> Self {
        Self {
            mailbox,
            actions,
            clock,
            faults: FaultPlan::default(),
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Sleep before each submission so worker threads interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Total submit calls, successful or not.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, action: RecordedAction) {
        self.actions.write().unwrap().push(action);
    }
}

impl Submitter for MockSubmitter {
    fn submit(&self, envelope: &Envelope) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }

        if self.faults.reject_calls.contains(&call) {
            self.record(RecordedAction::Rejected { call });
            return Err(eyre!("554 transaction failed (call {})", call));
        }

        let text = envelope.render(self.clock.now());
        if FaultPlan::fires(self.faults.drop_every, call) {
            self.record(RecordedAction::Dropped { call });
            return Ok(());
        }

        let delivered = if FaultPlan::fires(self.faults.unmarked_every, call) {
            text
        } else {
            format!("{}{}", CLASSIFICATION_HEADER, text)
        };

        let copies = if FaultPlan::fires(self.faults.duplicate_every, call) { 2 } else { 1 };
        let uids: Vec<u32> = {
            let mut mailbox = self.mailbox.write().unwrap();
            (0..copies).map(|_| mailbox.deliver(delivered.clone())).collect()
        };
        for uid in uids {
            self.record(RecordedAction::Delivered { call, uid });
        }
        Ok(())
    }
}

/// Inspector that drains the VirtualMailbox.
pub struct MockInspector {
    mailbox: Arc<RwLock<VirtualMailbox>>,
    actions: ActionLog,
}

impl MockInspector {
    pub fn new(mailbox: Arc<RwLock<VirtualMailbox>>, actions: ActionLog) -> Self {
        Self { mailbox, actions }
    }
}

impl MailboxInspector for MockInspector {
    fn count(&mut self) -> Result<usize> {
        let pending = self.mailbox.read().unwrap().message_count();
        self.actions.write().unwrap().push(RecordedAction::Count { pending });
        Ok(pending)
    }

    fn pop_oldest_text(&mut self) -> Result<String> {
        let msg = self
            .mailbox
            .write()
            .unwrap()
            .pop_oldest()
            .ok_or_else(|| HarnessError::from(VerificationFailure::MailboxEmpty))?;
        self.actions.write().unwrap().push(RecordedAction::Pop { uid: msg.uid });
        Ok(msg.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(faults: FaultPlan) -> (MockSubmitter, MockInspector, Arc<RwLock<VirtualMailbox>>) {
        let mailbox = Arc::new(RwLock::new(VirtualMailbox::new("test@test.com")));
        let actions: ActionLog = Arc::new(RwLock::new(Vec::new()));
        let submitter = MockSubmitter::new(Arc::clone(&mailbox), Arc::clone(&actions), VirtualClock::new())
            .with_faults(faults);
        let inspector = MockInspector::new(Arc::clone(&mailbox), actions);
        (submitter, inspector, mailbox)
    }

    fn envelope() -> Envelope {
        Envelope::new("test@test.com", "test@test.com", "test", "test")
    }

    #[test]
    fn test_submit_classifies_and_delivers() {
        let (submitter, mut inspector, _) = setup(FaultPlan::default());
        submitter.submit(&envelope()).unwrap();

        assert_eq!(inspector.count().unwrap(), 1);
        let text = inspector.pop_oldest_text().unwrap();
        assert!(text.starts_with("X-Spam-Status: No"));
        assert!(text.contains("Subject: test"));
    }

    #[test]
    fn test_faults_fire_on_schedule() {
        let faults = FaultPlan {
            drop_every: Some(4),
            duplicate_every: Some(3),
            unmarked_every: Some(5),
            reject_calls: vec![2],
        };
        let (submitter, _, mailbox) = setup(faults);

        let results: Vec<bool> = (0..6).map(|_| submitter.submit(&envelope()).is_ok()).collect();
        assert_eq!(results, vec![true, false, true, true, true, true]);
        assert_eq!(submitter.call_count(), 6);

        // call 1: 1, call 2: rejected, call 3: 2 copies, call 4: dropped,
        // call 5: 1 unmarked, call 6: 2 copies
        let mailbox = mailbox.read().unwrap();
        assert_eq!(mailbox.message_count(), 6);
    }

    #[test]
    fn test_pop_empty_is_mailbox_empty_error() {
        let (_, mut inspector, _) = setup(FaultPlan::default());
        let err = inspector.pop_oldest_text().unwrap_err();
        assert_eq!(
            err.downcast_ref::<HarnessError>(),
            Some(&HarnessError::Verification(VerificationFailure::MailboxEmpty))
        );
    }

    #[test]
    fn test_actions_recorded() {
        let (submitter, mut inspector, _) = setup(FaultPlan::default());
        submitter.submit(&envelope()).unwrap();
        inspector.count().unwrap();
        inspector.pop_oldest_text().unwrap();

        let actions = inspector.actions.read().unwrap().clone();
        assert_eq!(
            actions,
            vec![
                RecordedAction::Delivered { call: 1, uid: 1 },
                RecordedAction::Count { pending: 1 },
                RecordedAction::Pop { uid: 1 },
            ]
        );
        assert!(actions[0].is_delivery());
        assert!(actions[1].is_retrieval());
    }
}
