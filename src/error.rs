// src/error.rs
//
// Typed failure taxonomy for a stress run. Public functions return
// `eyre::Result`; these values ride inside the report and can be recovered
// with `downcast_ref::<HarnessError>()`.

use std::fmt;

/// Why a verification pass failed.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationFailure {
    /// Pending count differed from the expected total before anything was popped.
    CountMismatch { expected: usize, actual: usize },
    /// A popped message did not carry the classification marker.
    MarkerMissing {
        index: usize,
        marker: String,
        content: String,
    },
    /// A pop was attempted against an empty mailbox.
    MailboxEmpty,
}

impl VerificationFailure {
    /// True when fewer messages arrived than were submitted.
    pub fn is_loss(&self) -> bool {
        matches!(self, VerificationFailure::CountMismatch { expected, actual } if actual < expected)
    }

    /// True when more messages are pending than this run submitted.
    pub fn is_contamination(&self) -> bool {
        matches!(self, VerificationFailure::CountMismatch { expected, actual } if actual > expected)
    }
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationFailure::CountMismatch { expected, actual } if actual < expected => write!(
                f,
                "message loss: expected {} pending messages, found {}",
                expected, actual
            ),
            VerificationFailure::CountMismatch { expected, actual } => write!(
                f,
                "mailbox contamination: expected {} pending messages, found {}",
                expected, actual
            ),
            VerificationFailure::MarkerMissing { index, marker, content } => write!(
                f,
                "message #{} is missing marker '{}':\n{}",
                index, marker, content
            ),
            VerificationFailure::MailboxEmpty => write!(f, "no message pending in mailbox"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HarnessError {
    /// Setup failed before any load was generated.
    Precondition(String),
    /// A single send failed. `worker` is `None` for the sequential scenario.
    Submission { worker: Option<usize>, message: String },
    Verification(VerificationFailure),
    /// The retrieval channel answered with something unusable.
    Protocol(String),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Precondition(msg) => write!(f, "Precondition failed: {}", msg),
            HarnessError::Submission { worker: Some(id), message } => {
                write!(f, "Submission failed in worker {}: {}", id, message)
            }
            HarnessError::Submission { worker: None, message } => {
                write!(f, "Submission failed: {}", message)
            }
            HarnessError::Verification(failure) => write!(f, "Verification failed: {}", failure),
            HarnessError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<VerificationFailure> for HarnessError {
    fn from(failure: VerificationFailure) -> Self {
        HarnessError::Verification(failure)
    }
}

/// Find the `HarnessError` carried by a report, if any.
pub fn harness_error(report: &eyre::Report) -> Option<&HarnessError> {
    report.downcast_ref::<HarnessError>()
}
