use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;

use jrn_core::{
    config::Config, fetch::HttpFetcher, messaging::MessagingPort, watch::ResultWatcher,
};
use jrn_telegram::TelegramMessenger;

/// Watches the JNTUK results page and notifies a Telegram chat when a new
/// B.Tech result appears in the top row.
#[derive(Debug, Parser)]
#[command(name = "jrn", version, about)]
struct Cli {
    /// Run a single check cycle and exit (for cron / GitHub Actions).
    #[arg(long)]
    once: bool,

    /// Override the poll interval in seconds.
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jrn_core::logging::init("jrn").context("failed to initialize logging")?;

    let cli = Cli::parse();
    let mut cfg = Config::load().context("failed to load configuration")?;
    if let Some(secs) = cli.interval {
        cfg.check_interval = Duration::from_secs(secs);
    }
    let cfg = Arc::new(cfg);

    let source = Arc::new(HttpFetcher::new(&cfg).context("failed to build HTTP client")?);
    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::from_config(&cfg));
    let watcher = ResultWatcher::new(cfg.clone(), source, messenger);

    if cli.once {
        run_cycle_logged(&watcher).await;
        return Ok(());
    }

    tracing::info!(
        url = %cfg.results_url,
        interval_secs = cfg.check_interval.as_secs(),
        "starting poll loop"
    );
    loop {
        run_cycle_logged(&watcher).await;
        tokio::time::sleep(cfg.check_interval).await;
    }
}

async fn run_cycle_logged(watcher: &ResultWatcher) {
    match watcher.run_cycle().await {
        Ok(outcome) => tracing::debug!(?outcome, "check cycle finished"),
        Err(e) => tracing::error!("check cycle failed: {e}"),
    }
}
