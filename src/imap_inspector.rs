// src/imap_inspector.rs
//
// IMAP retrieval client. "Oldest pending" is sequence number 1 of INBOX;
// popping it is FETCH + \Deleted + EXPUNGE in one session.

use eyre::{eyre, Result, WrapErr};
use imap::Session;
use log::debug;
use native_tls::{TlsConnector, TlsStream};
use secure_string::SecureString;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::client_ops::{connect_tcp, MailboxInspector};
use crate::error::{HarnessError, VerificationFailure};

const MAILBOX: &str = "INBOX";

pub struct ImapInspector {
    host: String,
    port: u16,
    tls: bool,
    username: String,
    password: SecureString,
    timeout: Option<Duration>,
}

enum ImapSession {
    Plain(Session<TcpStream>),
    Tls(Session<TlsStream<TcpStream>>),
}

impl ImapInspector {
    pub fn new(host: &str, port: u16, tls: bool, username: &str, password: SecureString) -> Self {
        Self {
            host: host.to_string(),
            port,
            tls,
            username: username.to_string(),
            password,
            timeout: None,
        }
    }

    /// Applied to connect, read and write, TLS handshake included.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn login(&self) -> Result<ImapSession> {
        debug!(
            "Connecting to IMAP {}:{} (tls={}) as {}",
            self.host, self.port, self.tls, self.username
        );
        let addr = format!("{}:{}", self.host, self.port);
        let stream = connect_tcp(&addr, self.timeout).wrap_err("IMAP connection failed")?;

        if self.tls {
            let tls = TlsConnector::builder().build()?;
            let stream = tls
                .connect(&self.host, stream)
                .map_err(|e| eyre!("TLS handshake with {} failed: {}", addr, e))?;
            let mut client = imap::Client::new(stream);
            client.read_greeting()?;
            let session = client
                .login(&self.username, self.password.unsecure())
                .map_err(|(e, _)| eyre!("IMAP login failed for {}: {}", self.username, e))?;
            Ok(ImapSession::Tls(session))
        } else {
            let mut client = imap::Client::new(stream);
            client.read_greeting()?;
            let session = client
                .login(&self.username, self.password.unsecure())
                .map_err(|(e, _)| eyre!("IMAP login failed for {}: {}", self.username, e))?;
            Ok(ImapSession::Plain(session))
        }
    }
}

impl MailboxInspector for ImapInspector {
    fn count(&mut self) -> Result<usize> {
        match self.login()? {
            ImapSession::Plain(mut s) => count_in(&mut s),
            ImapSession::Tls(mut s) => count_in(&mut s),
        }
    }

    fn pop_oldest_text(&mut self) -> Result<String> {
        match self.login()? {
            ImapSession::Plain(mut s) => pop_first_in(&mut s),
            ImapSession::Tls(mut s) => pop_first_in(&mut s),
        }
    }
}

fn count_in<T>(session: &mut Session<T>) -> Result<usize>
where
    T: Read + Write,
{
    let mailbox = session.select(MAILBOX)?;
    debug!("SELECT {} reports {} messages", MAILBOX, mailbox.exists);
    session.logout()?;
    Ok(mailbox.exists as usize)
}

fn pop_first_in<T>(session: &mut Session<T>) -> Result<String>
where
    T: Read + Write,
{
    let mailbox = session.select(MAILBOX)?;
    if mailbox.exists == 0 {
        session.logout()?;
        return Err(HarnessError::from(VerificationFailure::MailboxEmpty).into());
    }

    let fetches = session.fetch("1", "RFC822")?;
    let body = fetches
        .iter()
        .find_map(|f| f.body())
        .ok_or_else(|| HarnessError::Protocol("FETCH 1 RFC822 returned no body".to_string()))?;
    let text = String::from_utf8_lossy(body).into_owned();

    session.store("1", "+FLAGS (\\Deleted)")?;
    session.expunge()?;
    session.logout()?;

    debug!("Popped {} bytes from {}", text.len(), MAILBOX);
    Ok(text)
}
