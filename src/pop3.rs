// src/pop3.rs
//
// Blocking POP3 retrieval client. Each operation is its own session so a
// DELE is committed by QUIT before the call returns.

use eyre::{Result, WrapErr};
use log::debug;
use secure_string::SecureString;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::client_ops::{connect_tcp, MailboxInspector};
use crate::error::{HarnessError, VerificationFailure};

pub struct Pop3Inspector {
    addr: String,
    username: String,
    password: SecureString,
    timeout: Option<Duration>,
}

impl Pop3Inspector {
    pub fn new(host: &str, port: u16, username: &str, password: SecureString) -> Self {
        Self {
            addr: format!("{}:{}", host, port),
            username: username.to_string(),
            password,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn login(&self) -> Result<Pop3Session> {
        let stream = connect_tcp(&self.addr, self.timeout).wrap_err("POP3 connection failed")?;

        let mut session = Pop3Session::new(stream)?;
        session.read_status()?;
        session.command(&format!("USER {}", self.username))?;
        session
            .command(&format!("PASS {}", self.password.unsecure()))
            .wrap_err_with(|| format!("POP3 login failed for {}", self.username))?;
        Ok(session)
    }
}

impl MailboxInspector for Pop3Inspector {
    fn count(&mut self) -> Result<usize> {
        let mut session = self.login()?;
        let count = session.stat()?;
        session.quit()?;
        Ok(count)
    }

    fn pop_oldest_text(&mut self) -> Result<String> {
        let mut session = self.login()?;
        if session.stat()? == 0 {
            session.quit()?;
            return Err(HarnessError::from(VerificationFailure::MailboxEmpty).into());
        }

        session.command("RETR 1")?;
        let text = session.read_multiline()?;
        session.command("DELE 1")?;
        session.quit()?;

        debug!("Popped {} bytes from {}", text.len(), self.username);
        Ok(text)
    }
}

struct Pop3Session {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Pop3Session {
    fn new(stream: TcpStream) -> Result<Self> {
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Message content may carry 8-bit bytes; they are decoded lossily.
    fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            return Err(HarnessError::Protocol("POP3 server closed the connection".to_string()).into());
        }
        Ok(String::from_utf8_lossy(&line).trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read a status line; `+OK` yields the remainder, `-ERR` an error.
    fn read_status(&mut self) -> Result<String> {
        let line = self.read_line()?;
        parse_status(&line)
    }

    fn command(&mut self, cmd: &str) -> Result<String> {
        if cmd.starts_with("PASS ") {
            debug!("POP3 >> PASS ****");
        } else {
            debug!("POP3 >> {}", cmd);
        }
        self.writer.write_all(cmd.as_bytes())?;
        self.writer.write_all(b"\r\n")?;
        self.writer.flush()?;
        self.read_status()
    }

    fn stat(&mut self) -> Result<usize> {
        let reply = self.command("STAT")?;
        parse_stat(&reply)
    }

    /// Read a dot-terminated body, undoing byte-stuffing.
    fn read_multiline(&mut self) -> Result<String> {
        let mut out = String::new();
        loop {
            let line = self.read_line()?;
            if line == "." {
                return Ok(out);
            }
            let line = line.strip_prefix('.').unwrap_or(&line);
            out.push_str(line);
            out.push_str("\r\n");
        }
    }

    fn quit(&mut self) -> Result<()> {
        self.command("QUIT").map(|_| ())
    }
}

fn parse_status(line: &str) -> Result<String> {
    if let Some(rest) = line.strip_prefix("+OK") {
        Ok(rest.trim_start().to_string())
    } else if let Some(rest) = line.strip_prefix("-ERR") {
        Err(HarnessError::Protocol(format!("POP3 server replied -ERR {}", rest.trim_start())).into())
    } else {
        Err(HarnessError::Protocol(format!("Malformed POP3 status line: '{}'", line)).into())
    }
}

/// Parse the message count out of a STAT reply ("<count> <octets>").
fn parse_stat(reply: &str) -> Result<usize> {
    reply
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| HarnessError::Protocol(format!("Malformed STAT reply: '{}'", reply)).into())
}
