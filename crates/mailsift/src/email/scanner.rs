//! Per-account ingestion cycle: fetch, decode, extract, store, mark read.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::categorizer::classify;
use crate::config::AccountCredential;
use crate::report::{
    AccountReport, AccountStatus, MessageReport, MessageStatus, Stage, StoredAttachment,
};
use crate::storage::{safe_file_name, AttachmentStore};

use super::charset::normalize;
use super::error::EmailError;
use super::parser::{Attachment, ParsedMessage};
use super::session::{MailboxConnector, MailboxSession, MessageId};

/// Runs the ingestion cycle for one account at a time.
///
/// Cheap to clone; clones share the connector.
#[derive(Clone)]
pub struct MailboxScanner {
    connector: Arc<dyn MailboxConnector>,
    store: AttachmentStore,
}

/// What a raw message yielded before anything touched the disk.
struct Extracted {
    subject: Option<String>,
    attachments: Vec<Attachment>,
}

impl MailboxScanner {
    pub fn new(connector: Arc<dyn MailboxConnector>, store: AttachmentStore) -> Self {
        Self { connector, store }
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    /// Scans one account's unread mail. Never fails: problems end up in
    /// the returned report.
    pub async fn scan(&self, credential: &AccountCredential) -> AccountReport {
        let account = credential.username.as_str();
        let span = info_span!("account_scan", account = %account);

        async move {
            info!("Scanning mailbox");

            let mut session = match self.connector.open(credential).await {
                Ok(session) => session,
                Err(e) => {
                    error!(error = %e, "Could not open session, skipping account");
                    return AccountReport::failed(account, e);
                }
            };

            let report = self.scan_session(account, session.as_mut()).await;
            session.close().await;

            info!(
                unread = report.unread,
                stored = report.stored_count(),
                failed = report.failed_messages().count(),
                "Mailbox scan finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn scan_session(&self, account: &str, session: &mut dyn MailboxSession) -> AccountReport {
        let listing = match session.list_unread().await {
            Ok(listing) => listing,
            Err(e) => {
                error!(error = %e, "Could not list unread messages, skipping account");
                return AccountReport::failed(account, e);
            }
        };

        info!(
            total = listing.total,
            unread = listing.unread.len(),
            "Mailbox listed"
        );

        let mut messages = Vec::with_capacity(listing.unread.len());
        for &id in &listing.unread {
            let report = self
                .process_message(account, session, id)
                .instrument(info_span!("message", id))
                .await;
            messages.push(report);
        }

        AccountReport {
            account: account.to_string(),
            total_messages: listing.total,
            unread: listing.unread.len(),
            status: AccountStatus::Completed,
            messages,
        }
    }

    async fn process_message(
        &self,
        account: &str,
        session: &mut dyn MailboxSession,
        id: MessageId,
    ) -> MessageReport {
        let raw = match session.fetch(id).await {
            Ok(raw) => raw,
            Err(e) => return fail(id, Stage::Fetch, e),
        };

        let extracted = match extract(&raw) {
            Ok(extracted) => extracted,
            Err((stage, e)) => return fail(id, stage, e),
        };

        if extracted.attachments.is_empty() {
            info!("No attachments in message");
        } else {
            info!(count = extracted.attachments.len(), "Found attachments");
        }

        let mut stored = Vec::with_capacity(extracted.attachments.len());
        let mut store_errors = Vec::new();
        for attachment in &extracted.attachments {
            // Classify the name the file is actually written under.
            let category = classify(safe_file_name(&attachment.name));
            match self.store.store(attachment, account, category).await {
                Ok(path) => {
                    info!(path = %path.display(), "Attachment saved");
                    stored.push(StoredAttachment {
                        name: attachment.name.clone(),
                        category: category.to_string(),
                        path,
                    });
                }
                Err(e) => {
                    error!(name = %attachment.name, error = %e, "Failed to save attachment");
                    store_errors.push(e.to_string());
                }
            }
        }

        let status = if !store_errors.is_empty() {
            // Leave the message unread so the next pass retries it.
            MessageStatus::Failed {
                stage: Stage::Store,
                reason: store_errors.join("; "),
            }
        } else {
            match session.mark_read(id).await {
                Ok(()) => {
                    debug!("Message marked as read");
                    MessageStatus::Processed
                }
                Err(e) => {
                    warn!(error = %e, "Could not mark message as read, it will be processed again");
                    MessageStatus::FlagFailed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        MessageReport {
            id,
            subject: extracted.subject,
            attachments: stored,
            status,
        }
    }
}

/// Decodes and parses a raw message and pulls out its attachments.
fn extract(raw: &[u8]) -> Result<Extracted, (Stage, EmailError)> {
    let decoded = normalize(raw).map_err(|e| (Stage::Decode, e))?;
    let message = ParsedMessage::parse(&decoded).map_err(|e| (Stage::Parse, e))?;
    let subject = message.subject().map(str::to_string);
    debug!(subject = subject.as_deref().unwrap_or("(no subject)"), "Parsed message");

    let attachments = message
        .extract_attachments()
        .map_err(|e| (Stage::Extract, e))?;

    Ok(Extracted {
        subject,
        attachments,
    })
}

fn fail(id: MessageId, stage: Stage, e: EmailError) -> MessageReport {
    error!(stage = ?stage, error = %e, "Message processing failed, leaving it unread");
    MessageReport::failed(id, stage, e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_message() {
        let raw = b"Subject: hi\r\nContent-Type: text/plain\r\n\r\nhello";
        let extracted = extract(raw).unwrap();
        assert_eq!(extracted.subject.as_deref(), Some("hi"));
        assert!(extracted.attachments.is_empty());
    }

    #[test]
    fn test_extract_reports_stage() {
        let (stage, _) = extract(b"Subject: hi\r\n\r\nno content type").err().unwrap();
        assert_eq!(stage, Stage::Extract);

        let (stage, _) = extract(b"").err().unwrap();
        assert_eq!(stage, Stage::Parse);
    }
}
