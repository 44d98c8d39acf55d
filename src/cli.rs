// src/cli.rs

use clap::{Parser, ValueEnum};
use secure_string::SecureString;
use std::path::PathBuf;

use crate::cfg::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    Sequential,
    Concurrent,
    Both,
}

impl Scenario {
    pub fn sequential(&self) -> bool {
        matches!(self, Scenario::Sequential | Scenario::Both)
    }

    pub fn concurrent(&self) -> bool {
        matches!(self, Scenario::Concurrent | Scenario::Both)
    }
}

/// Command-line interface options for spam-stress.
/// Anything given here overrides the config file.
#[derive(Parser, Debug)]
#[command(
    name = "spam-stress",
    version = env!("GIT_DESCRIBE"),
    about = "Stress-test a mail server's spam-classification pipeline",
    long_about = None
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "spam-stress.yml")]
    pub config: PathBuf,

    /// SMTP submission host
    #[arg(long, env = "SPAM_STRESS_SMTP_HOST")]
    pub smtp_host: Option<String>,

    /// SMTP submission port
    #[arg(long)]
    pub smtp_port: Option<u16>,

    /// POP3/IMAP retrieval host
    #[arg(long, env = "SPAM_STRESS_RETRIEVAL_HOST")]
    pub retrieval_host: Option<String>,

    /// Dedicated test account address
    #[arg(short = 'A', long, env = "SPAM_STRESS_ACCOUNT")]
    pub account: Option<String>,

    /// Test account password
    #[arg(short = 'P', long, env = "SPAM_STRESS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Messages submitted by each worker
    #[arg(short, long)]
    pub messages: Option<usize>,

    /// Messages submitted by the sequential scenario
    #[arg(long)]
    pub sequential_messages: Option<usize>,

    /// Which scenario(s) to run
    #[arg(short, long, value_enum, default_value_t = Scenario::Both)]
    pub scenario: Scenario,

    #[arg(short, long, help = "turn on debug logging")]
    pub debug: bool,
}

impl Cli {
    /// Fold command-line overrides into a loaded config.
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(host) = &self.smtp_host {
            cfg.submission.host = host.clone();
        }
        if let Some(port) = self.smtp_port {
            cfg.submission.port = port;
        }
        if let Some(host) = &self.retrieval_host {
            cfg.retrieval.host = host.clone();
        }
        if let Some(account) = &self.account {
            cfg.account.address = account.clone();
        }
        if let Some(password) = &self.password {
            cfg.account.password = Some(SecureString::from(password.as_str()));
        }
        if let Some(workers) = self.workers {
            cfg.scenario.workers = workers;
        }
        if let Some(messages) = self.messages {
            cfg.scenario.messages_per_worker = messages;
        }
        if let Some(messages) = self.sequential_messages {
            cfg.scenario.sequential_messages = messages;
        }
    }
}
