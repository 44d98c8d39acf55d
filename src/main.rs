use clap::Parser;
use env_logger::Builder;
use eyre::Result;
use log::{info, LevelFilter};
use std::sync::Arc;

use spam_stress::cfg::config::{load_config, Config, RetrievalProtocol};
use spam_stress::cli::{Cli, Scenario};
use spam_stress::error::HarnessError;
use spam_stress::imap_inspector::ImapInspector;
use spam_stress::pop3::Pop3Inspector;
use spam_stress::smtp::SmtpSubmitter;
use spam_stress::{MailboxInspector, StressRunner, Submitter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();
    if cli.debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.try_init().ok();

    let mut config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        info!("No config at {}; using defaults", cli.config.display());
        Config::default()
    };
    cli.apply(&mut config);

    run(config, cli.scenario)
}

fn run(mut config: Config, scenario: Scenario) -> Result<()> {
    info!(
        "Anti-spam: enabled={} host={} port={}",
        config.anti_spam.enabled, config.anti_spam.host, config.anti_spam.port
    );
    config.anti_spam.check_classifier_reachable()?;

    let password = config.account.password.take().ok_or_else(|| {
        HarnessError::Precondition(format!("no password configured for {}", config.account.address))
    })?;

    let submitter: Arc<dyn Submitter> = Arc::new(
        SmtpSubmitter::new(&config.submission.host, config.submission.port)
            .helo(&config.submission.helo)
            .timeout(config.submission.timeout()),
    );

    let retrieval = &config.retrieval;
    let inspector: Box<dyn MailboxInspector> = match retrieval.protocol {
        RetrievalProtocol::Pop3 => Box::new(
            Pop3Inspector::new(&retrieval.host, retrieval.port(), &config.account.address, password)
                .timeout(retrieval.timeout()),
        ),
        RetrievalProtocol::Imap => Box::new(
            ImapInspector::new(
                &retrieval.host,
                retrieval.port(),
                retrieval.tls,
                &config.account.address,
                password,
            )
            .timeout(retrieval.timeout()),
        ),
    };

    let settings = config.scenario.run_settings(config.message.envelope());
    let mut runner = StressRunner::new(submitter, inspector, settings);

    if scenario.sequential() {
        runner.ensure_empty()?;
        let report = runner.run_sequential(config.scenario.sequential_messages)?;
        info!("✅ Sequential scenario passed: {} messages", report.verification.popped);
    }

    if scenario.concurrent() {
        runner.ensure_empty()?;
        let report = runner.run_concurrent(config.scenario.workers, config.scenario.messages_per_worker)?;
        info!(
            "✅ Concurrent scenario passed: {} workers, {} messages",
            report.workers.len(),
            report.verification.popped
        );
    }

    Ok(())
}
