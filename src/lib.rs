// src/lib.rs
//
// Library entry point for spam-stress.
// Re-exports modules needed by integration tests.

pub mod cfg;
pub mod cli;
pub mod client_ops;
pub mod error;
pub mod imap_inspector;
pub mod message;
pub mod pop3;
pub mod runner;
pub mod smtp;
pub mod worker;

pub use client_ops::{Clock, MailboxInspector, RealClock, Submitter};
pub use error::{HarnessError, VerificationFailure};
pub use runner::{RunSettings, StressRunner};
