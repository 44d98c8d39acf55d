// src/cfg/config.rs

use eyre::{eyre, Result};
use log::{debug, error};
use secure_string::SecureString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cfg::antispam::AntiSpamSettings;
use crate::cfg::secure;
use crate::message::Envelope;
use crate::runner::{MarkerMatch, RunSettings};
use crate::worker::FailurePolicy;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub submission: SubmissionConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub account: AccountConfig,

    #[serde(alias = "anti-spam", default)]
    pub anti_spam: AntiSpamSettings,

    #[serde(default)]
    pub scenario: ScenarioConfig,

    #[serde(default)]
    pub message: MessageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default = "default_helo")]
    pub helo: String,

    /// Socket timeout for connect/read/write. Unset means block forever.
    #[serde(alias = "timeout-secs", default)]
    pub timeout_secs: Option<u64>,
}

impl SubmissionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_smtp_port(),
            helo: default_helo(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalProtocol {
    #[default]
    Pop3,
    Imap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub protocol: RetrievalProtocol,

    #[serde(default = "default_host")]
    pub host: String,

    /// Defaults to 110 for POP3, 143 for IMAP and 993 for IMAP over TLS.
    #[serde(default)]
    pub port: Option<u16>,

    /// IMAP only.
    #[serde(default)]
    pub tls: bool,

    #[serde(alias = "timeout-secs", default)]
    pub timeout_secs: Option<u64>,
}

impl RetrievalConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(match self.protocol {
            RetrievalProtocol::Pop3 => 110,
            RetrievalProtocol::Imap if self.tls => 993,
            RetrievalProtocol::Imap => 143,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            protocol: RetrievalProtocol::default(),
            host: default_host(),
            port: None,
            tls: false,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default, deserialize_with = "secure::deserialize_opt")]
    pub password: Option<SecureString>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            password: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(alias = "messages-per-worker", default = "default_messages_per_worker")]
    pub messages_per_worker: usize,

    #[serde(alias = "sequential-messages", default = "default_sequential_messages")]
    pub sequential_messages: usize,

    #[serde(default = "default_marker")]
    pub marker: String,

    #[serde(alias = "marker-match", default)]
    pub marker_match: MarkerMatch,

    #[serde(alias = "failure-policy", default)]
    pub failure_policy: FailurePolicy,

    #[serde(alias = "propagate-worker-errors", default = "default_true")]
    pub propagate_worker_errors: bool,
}

impl ScenarioConfig {
    pub fn run_settings(&self, envelope: Envelope) -> RunSettings {
        RunSettings {
            envelope,
            marker: self.marker.clone(),
            marker_match: self.marker_match,
            failure_policy: self.failure_policy,
            propagate_worker_errors: self.propagate_worker_errors,
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            messages_per_worker: default_messages_per_worker(),
            sequential_messages: default_sequential_messages(),
            marker: default_marker(),
            marker_match: MarkerMatch::default(),
            failure_policy: FailurePolicy::default(),
            propagate_worker_errors: true,
        }
    }
}

/// The message every worker submits. Identity is irrelevant to verification.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "default_address")]
    pub from: String,

    #[serde(default = "default_address")]
    pub to: String,

    #[serde(default = "default_text")]
    pub subject: String,

    #[serde(default = "default_text")]
    pub body: String,
}

impl MessageConfig {
    pub fn envelope(&self) -> Envelope {
        Envelope::new(&self.from, &self.to, &self.subject, &self.body)
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            from: default_address(),
            to: default_address(),
            subject: default_text(),
            body: default_text(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_helo() -> String {
    "spam-stress".to_string()
}

fn default_address() -> String {
    "test@test.com".to_string()
}

fn default_text() -> String {
    "test".to_string()
}

fn default_workers() -> usize {
    5
}

fn default_messages_per_worker() -> usize {
    100
}

fn default_sequential_messages() -> usize {
    15
}

fn default_marker() -> String {
    "X-Spam-Status".to_string()
}

fn default_true() -> bool {
    true
}

pub fn load_config(config_path: &Path) -> Result<Config> {
    debug!("Loading configuration from {:?}", config_path);

    let content = fs::read_to_string(config_path).map_err(|e| {
        error!("Failed to read config file {}: {}", config_path.display(), e);
        eyre!("Failed to read config file {}: {}", config_path.display(), e)
    })?;

    let cfg = parse_config(&content)?;

    debug!("Successfully loaded configuration");
    Ok(cfg)
}

pub fn parse_config(content: &str) -> Result<Config> {
    serde_yaml::from_str(content).map_err(|e| {
        error!("Failed to parse YAML: {}", e);
        eyre!("Failed to parse YAML: {}", e)
    })
}
