//! Passes over all configured accounts, and the loop that repeats them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::config::AccountCredential;
use crate::email::MailboxScanner;
use crate::report::{AccountReport, PassReport};

/// Scans every account once per pass and sleeps between passes.
pub struct Poller {
    scanner: MailboxScanner,
    accounts: Vec<Arc<AccountCredential>>,
    concurrent: bool,
    interval: Duration,
}

impl Poller {
    pub fn new(
        scanner: MailboxScanner,
        accounts: Vec<AccountCredential>,
        concurrent: bool,
        interval: Duration,
    ) -> Self {
        Self {
            scanner,
            accounts: accounts.into_iter().map(Arc::new).collect(),
            concurrent,
            interval,
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Creates `<files>/<local-part>` for every account.
    pub async fn prepare_directories(&self) -> Result<(), crate::error::StorageError> {
        for credential in &self.accounts {
            self.scanner
                .store()
                .prepare_account(&credential.username)
                .await?;
        }
        info!(accounts = self.accounts.len(), "Account directories ready");
        Ok(())
    }

    /// Runs one pass over all accounts. Reports come back in configuration
    /// order regardless of mode.
    pub async fn run_pass(&self) -> PassReport {
        let started_at = Utc::now();

        let accounts = if self.concurrent {
            self.scan_concurrently().await
        } else {
            self.scan_sequentially().await
        };

        PassReport {
            started_at,
            finished_at: Utc::now(),
            accounts,
        }
    }

    async fn scan_sequentially(&self) -> Vec<AccountReport> {
        let mut reports = Vec::with_capacity(self.accounts.len());
        for credential in &self.accounts {
            reports.push(self.scanner.scan(credential).await);
        }
        reports
    }

    /// One task per account. Sessions never leave their task; only the
    /// finished report crosses the channel.
    async fn scan_concurrently(&self) -> Vec<AccountReport> {
        let (tx, mut rx) = mpsc::channel::<(usize, AccountReport)>(self.accounts.len().max(1));

        for (index, credential) in self.accounts.iter().enumerate() {
            let tx = tx.clone();
            let scanner = self.scanner.clone();
            let credential = Arc::clone(credential);
            tokio::spawn(async move {
                let report = scanner.scan(&credential).await;
                if tx.send((index, report)).await.is_err() {
                    warn!(account = %credential.username, "Pass collector went away");
                }
            });
        }
        drop(tx);

        let mut slots: Vec<Option<AccountReport>> = vec![None; self.accounts.len()];
        while let Some((index, report)) = rx.recv().await {
            slots[index] = Some(report);
        }

        slots
            .into_iter()
            .zip(&self.accounts)
            .map(|(slot, credential)| {
                slot.unwrap_or_else(|| {
                    error!(account = %credential.username, "Account task ended without a report");
                    AccountReport::failed(
                        credential.username.as_str(),
                        "account task ended without a report",
                    )
                })
            })
            .collect()
    }

    /// Repeats passes until `shutdown` flips to true. A running pass is
    /// always finished so sessions get logged out.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            accounts = self.accounts.len(),
            interval_secs = self.interval.as_secs(),
            concurrent = self.concurrent,
            "Poller started"
        );

        loop {
            let report = self.run_pass().await;
            info!(
                accounts = report.accounts.len(),
                failed_accounts = report.failed_account_count(),
                stored = report.stored_count(),
                failed_messages = report.failed_message_count(),
                "Pass complete"
            );

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    // A dropped sender also ends the loop.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Poller stopped");
    }
}
