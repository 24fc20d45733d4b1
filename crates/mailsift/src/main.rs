//! CLI entry point for mailsift.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use mailsift::config::{default_config_path, CONFIG_ENV_VAR};
use mailsift::telemetry::{init_tracing, LogFormat};
use mailsift::{
    load_config, AttachmentStore, ConfigError, CredentialProvider, ImapConnector, MailboxScanner,
    Poller,
};

#[derive(Parser, Debug)]
#[command(name = "mailsift")]
#[command(about = "Poll IMAP mailboxes and file unread attachments by type")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Run a single pass, print its report as JSON and exit
    #[arg(long)]
    once: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> mailsift::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    info!("Starting mailsift v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli
        .config
        .or_else(default_config_path)
        .ok_or_else(|| ConfigError::Validation {
            message: format!(
                "no configuration file given; pass --config or set {}",
                CONFIG_ENV_VAR
            ),
        })?;
    info!("Using config file {}", config_path.display());

    let config = load_config(&config_path)?;
    let credentials = config.credentials()?;

    let connector = Arc::new(ImapConnector::new(
        config.server.clone(),
        config.mailbox.clone(),
    ));
    let store = AttachmentStore::new(&config.files_dir);
    info!("Saving attachments under {}", store.root().display());
    let poller = Poller::new(
        MailboxScanner::new(connector, store),
        credentials,
        config.concurrent_accounts,
        Duration::from_secs(config.poll_interval),
    );

    info!("{} account(s) configured", poller.account_count());
    poller.prepare_directories().await?;

    if cli.once {
        let report = poller.run_pass().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, stopping after the current pass"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    poller.run(shutdown_rx).await;
    Ok(())
}
