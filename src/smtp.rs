// src/smtp.rs
//
// SMTP submission client. One SMTP session per message, driven by lettre's
// blocking transport.

use eyre::{Result, WrapErr};
use lettre::address::{Address, Envelope as SmtpEnvelope};
use lettre::transport::smtp::extension::ClientId;
use lettre::{SmtpTransport, Transport};
use log::debug;
use std::time::Duration;

use crate::client_ops::{Clock, RealClock, Submitter};
use crate::message::Envelope;

const DEFAULT_HELO: &str = "spam-stress";

/// Submits messages over plain SMTP.
#[derive(Clone)]
pub struct SmtpSubmitter<C: Clock = RealClock> {
    host: String,
    port: u16,
    helo: String,
    timeout: Option<Duration>,
    clock: C,
}

impl SmtpSubmitter<RealClock> {
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_clock(host, port, RealClock)
    }
}

impl<C: Clock> SmtpSubmitter<C> {
    pub fn with_clock(host: &str, port: u16, clock: C) -> Self {
        Self {
            host: host.to_string(),
            port,
            helo: DEFAULT_HELO.to_string(),
            timeout: None,
            clock,
        }
    }

    pub fn helo(mut self, helo: &str) -> Self {
        self.helo = helo.to_string();
        self
    }

    /// Applied to connect, read and write. `None` blocks indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn transport(&self) -> SmtpTransport {
        SmtpTransport::builder_dangerous(self.host.as_str())
            .port(self.port)
            .hello_name(ClientId::Domain(self.helo.clone()))
            .timeout(self.timeout)
            .build()
    }
}

/// SMTP envelope for `envelope`; the addresses must be valid mailboxes.
fn smtp_envelope(envelope: &Envelope) -> Result<SmtpEnvelope> {
    let from: Address = envelope
        .from
        .parse()
        .wrap_err_with(|| format!("Invalid sender address '{}'", envelope.from))?;
    let to: Address = envelope
        .to
        .parse()
        .wrap_err_with(|| format!("Invalid recipient address '{}'", envelope.to))?;
    Ok(SmtpEnvelope::new(Some(from), vec![to])?)
}

impl<C: Clock> Submitter for SmtpSubmitter<C> {
    fn submit(&self, envelope: &Envelope) -> Result<()> {
        let smtp_envelope = smtp_envelope(envelope)?;
        let rendered = envelope.render(self.clock.now());

        // Without a pool the transport closes with QUIT and ignores its reply,
        // so an accepted message is never reported as failed.
        let response = self
            .transport()
            .send_raw(&smtp_envelope, rendered.as_bytes())
            .wrap_err_with(|| {
                format!(
                    "Failed to submit message for {} via SMTP server {}:{}",
                    envelope.to, self.host, self.port
                )
            })?;

        debug!(
            "Submitted message from {} to {}: {} {}",
            envelope.from,
            envelope.to,
            response.code(),
            response.message().collect::<Vec<_>>().join(" ")
        );
        Ok(())
    }
}
