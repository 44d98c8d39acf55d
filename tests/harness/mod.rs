// tests/harness/mod.rs
//
// Integration testing harness for spam-stress.
// Provides an in-memory mail server: a FIFO mailbox, a submitter that
// "classifies" and delivers into it, and an inspector that drains it.

pub mod mock_client;
pub mod virtual_clock;

pub use mock_client::{FaultPlan, MockInspector, MockSubmitter, RecordedAction};
pub use test_harness::{TestHarness, ACCOUNT};
pub use virtual_clock::VirtualClock;
pub use virtual_mailbox::{MailboxMessage, VirtualMailbox};
