// src/message.rs

use chrono::{DateTime, Utc};
use mailparse::{parse_headers, MailHeaderMap};
use std::sync::atomic::{AtomicU64, Ordering};

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// One message as handed to the submission channel.
/// No validation is applied; malformed input is the server's business.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Envelope {
    pub fn new(from: &str, to: &str, subject: &str, body: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }

    /// Render as an RFC 5322 message with CRLF line endings.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        let domain = self.from.rsplit_once('@').map(|(_, d)| d).unwrap_or("localhost");
        let message_id = format!(
            "<{}.{}.{}@{}>",
            now.timestamp_millis(),
            std::process::id(),
            seq,
            domain
        );

        let mut out = String::with_capacity(self.body.len() + 256);
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str(&format!("Date: {}\r\n", now.to_rfc2822()));
        out.push_str(&format!("Message-ID: {}\r\n", message_id));
        out.push_str("\r\n");
        for line in self.body.lines() {
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }
}

/// Full text of a message popped from the mailbox.
#[derive(Debug, Clone)]
pub struct RetrievedMessage {
    pub text: String,
}

impl RetrievedMessage {
    pub fn new(text: String) -> Self {
        Self { text }
    }

    /// Substring search over the whole text, headers and body alike.
    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Value of the first header with this name (case-insensitive), if the
    /// header block parses.
    pub fn header(&self, name: &str) -> Option<String> {
        let (headers, _) = parse_headers(self.text.as_bytes()).ok()?;
        headers.get_first_value(name)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    pub fn subject(&self) -> String {
        self.header("Subject").unwrap_or_default()
    }
}
