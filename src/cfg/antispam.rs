// src/cfg/antispam.rs

use eyre::Result;
use log::{debug, info};
use serde::Deserialize;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::HarnessError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Spam-classifier integration the server under test is expected to run with.
/// Set once before a run and never changed while workers are active.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AntiSpamSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    783
}

impl Default for AntiSpamSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AntiSpamSettings {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            enabled: true,
            host: host.to_string(),
            port,
        }
    }

    /// Precondition: the classifier accepts TCP connections.
    /// A disabled classifier is not probed.
    pub fn check_classifier_reachable(&self) -> Result<()> {
        if !self.enabled {
            debug!("Spam classifier disabled; skipping reachability check");
            return Ok(());
        }

        let target = format!("{}:{}", self.host, self.port);
        let precondition = |reason: String| {
            HarnessError::Precondition(format!("spam classifier at {} is unreachable: {}", target, reason))
        };

        let addr = target
            .to_socket_addrs()
            .map_err(|e| precondition(e.to_string()))?
            .next()
            .ok_or_else(|| precondition("no address resolved".to_string()))?;

        TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).map_err(|e| precondition(e.to_string()))?;

        info!("🛡️ Spam classifier reachable at {}", target);
        Ok(())
    }
}
