// src/client_ops.rs
//
// Trait abstraction for the two channels the harness talks through.
// Production code uses SMTP/POP3/IMAP clients; tests plug in mocks.

use chrono::{DateTime, Utc};
use eyre::{eyre, Result, WrapErr};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::message::Envelope;

/// Hands one message to the server for delivery.
///
/// Implementations hold no per-call mutable state so a single instance can be
/// shared by every worker thread. A failed submit is never retried here.
pub trait Submitter: Send + Sync {
    fn submit(&self, envelope: &Envelope) -> Result<()>;
}

/// Reads and removes messages from one mailbox.
///
/// The mailbox address and credential are fixed at construction.
pub trait MailboxInspector {
    /// Number of messages currently pending.
    fn count(&mut self) -> Result<usize>;

    /// Full text of the oldest pending message, removing it from the mailbox.
    /// Fails if nothing is pending.
    fn pop_oldest_text(&mut self) -> Result<String>;
}

impl<T: MailboxInspector + ?Sized> MailboxInspector for Box<T> {
    fn count(&mut self) -> Result<usize> {
        (**self).count()
    }

    fn pop_oldest_text(&mut self) -> Result<String> {
        (**self).pop_oldest_text()
    }
}

/// Open a TCP connection to `addr` ("host:port"), bounding connect, read and
/// write by `timeout`. `None` blocks indefinitely.
pub(crate) fn connect_tcp(addr: &str, timeout: Option<Duration>) -> Result<TcpStream> {
    let stream = match timeout {
        Some(timeout) => {
            let resolved = addr
                .to_socket_addrs()
                .wrap_err_with(|| format!("Failed to resolve {}", addr))?
                .next()
                .ok_or_else(|| eyre!("No address found for {}", addr))?;
            TcpStream::connect_timeout(&resolved, timeout)
        }
        None => TcpStream::connect(addr),
    }
    .wrap_err_with(|| format!("Failed to connect to {}", addr))?;

    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;
    Ok(stream)
}

/// Trait for time providers.
/// Allows production code to use real time or a fixed time for testing.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real clock implementation using system time.
#[derive(Clone, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
