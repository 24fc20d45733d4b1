//! Outcome records for a polling pass.
//!
//! Every account and every unread message gets an entry, so a failed
//! message or an unreachable account is visible without digging through
//! logs.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::email::MessageId;

/// Pipeline step a message failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Decode,
    Parse,
    Extract,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MessageStatus {
    /// Attachments stored and message flagged `\Seen`.
    Processed,
    /// Attachments stored but the flag could not be set; the message will
    /// come back on the next pass.
    FlagFailed { reason: String },
    /// Processing stopped; the message stays unread.
    Failed { stage: Stage, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAttachment {
    pub name: String,
    pub category: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageReport {
    pub id: MessageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub attachments: Vec<StoredAttachment>,
    #[serde(flatten)]
    pub status: MessageStatus,
}

impl MessageReport {
    pub fn failed(id: MessageId, stage: Stage, reason: impl ToString) -> Self {
        Self {
            id,
            subject: None,
            attachments: Vec::new(),
            status: MessageStatus::Failed {
                stage,
                reason: reason.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, MessageStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccountStatus {
    Completed,
    /// Session could not be opened or the mailbox could not be listed.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountReport {
    pub account: String,
    pub total_messages: u32,
    pub unread: usize,
    #[serde(flatten)]
    pub status: AccountStatus,
    pub messages: Vec<MessageReport>,
}

impl AccountReport {
    pub fn failed(account: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            account: account.into(),
            total_messages: 0,
            unread: 0,
            status: AccountStatus::Failed {
                reason: reason.to_string(),
            },
            messages: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, AccountStatus::Failed { .. })
    }

    pub fn stored_count(&self) -> usize {
        self.messages.iter().map(|m| m.attachments.len()).sum()
    }

    pub fn failed_messages(&self) -> impl Iterator<Item = &MessageReport> {
        self.messages.iter().filter(|m| m.is_failed())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub accounts: Vec<AccountReport>,
}

impl PassReport {
    pub fn stored_count(&self) -> usize {
        self.accounts.iter().map(AccountReport::stored_count).sum()
    }

    pub fn failed_message_count(&self) -> usize {
        self.accounts
            .iter()
            .map(|a| a.failed_messages().count())
            .sum()
    }

    pub fn failed_account_count(&self) -> usize {
        self.accounts.iter().filter(|a| a.is_failed()).count()
    }
}
