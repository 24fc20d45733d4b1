//! Shared utilities for mailsift integration tests.
//!
//! `FakeConnector` stands in for the IMAP server: each account gets an
//! in-memory mailbox whose seen flags and session counters the tests can
//! inspect after a scan.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mailsift::{
    AccountCredential, EmailError, MailboxConnector, MailboxSession, MessageId, UnreadListing,
};

/// One message sitting on the fake server.
#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub raw: Vec<u8>,
    pub seen: bool,
}

/// Server-side state of one mailbox.
#[derive(Debug, Default)]
pub struct MailboxState {
    pub messages: Vec<FakeMessage>,
    pub failing_fetches: HashSet<MessageId>,
    pub reject_flags: bool,
    pub opened: usize,
    pub closed: usize,
}

impl MailboxState {
    pub fn unseen_ids(&self) -> Vec<MessageId> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.seen)
            .map(|(i, _)| i as MessageId + 1)
            .collect()
    }

    pub fn is_seen(&self, id: MessageId) -> bool {
        self.message(id).map(|m| m.seen).unwrap_or(false)
    }

    fn message(&self, id: MessageId) -> Option<&FakeMessage> {
        (id as usize).checked_sub(1).and_then(|i| self.messages.get(i))
    }

    fn message_mut(&mut self, id: MessageId) -> Option<&mut FakeMessage> {
        (id as usize)
            .checked_sub(1)
            .and_then(move |i| self.messages.get_mut(i))
    }
}

pub type SharedMailbox = Arc<Mutex<MailboxState>>;

/// Opens sessions on in-memory mailboxes. Unknown usernames fail login.
#[derive(Default)]
pub struct FakeConnector {
    mailboxes: HashMap<String, SharedMailbox>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mailbox holding `messages`, all unseen, with ids
    /// starting at 1.
    pub fn add_mailbox(&mut self, username: &str, messages: Vec<Vec<u8>>) -> SharedMailbox {
        let state = MailboxState {
            messages: messages
                .into_iter()
                .map(|raw| FakeMessage { raw, seen: false })
                .collect(),
            ..Default::default()
        };
        let shared = Arc::new(Mutex::new(state));
        self.mailboxes
            .insert(username.to_string(), Arc::clone(&shared));
        shared
    }

    pub fn into_shared(self) -> Arc<dyn MailboxConnector> {
        Arc::new(self)
    }
}

#[async_trait]
impl MailboxConnector for FakeConnector {
    async fn open(
        &self,
        credential: &AccountCredential,
    ) -> Result<Box<dyn MailboxSession>, EmailError> {
        let state = self
            .mailboxes
            .get(&credential.username)
            .cloned()
            .ok_or_else(|| {
                EmailError::AuthenticationFailed(format!(
                    "LOGIN rejected for {}",
                    credential.username
                ))
            })?;
        state.lock().unwrap().opened += 1;
        Ok(Box::new(FakeSession { state }))
    }
}

struct FakeSession {
    state: SharedMailbox,
}

#[async_trait]
impl MailboxSession for FakeSession {
    async fn list_unread(&mut self) -> Result<UnreadListing, EmailError> {
        let state = self.state.lock().unwrap();
        Ok(UnreadListing {
            total: state.messages.len() as u32,
            unread: state.unseen_ids(),
        })
    }

    async fn fetch(&mut self, id: MessageId) -> Result<Vec<u8>, EmailError> {
        let state = self.state.lock().unwrap();
        if state.failing_fetches.contains(&id) {
            return Err(EmailError::FetchFailed {
                id,
                reason: "connection reset".to_string(),
            });
        }
        state
            .message(id)
            .map(|m| m.raw.clone())
            .ok_or(EmailError::MessageNotFound(id))
    }

    async fn mark_read(&mut self, id: MessageId) -> Result<(), EmailError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_flags {
            return Err(EmailError::FlagFailed {
                id,
                reason: "STORE rejected".to_string(),
            });
        }
        let message = state
            .message_mut(id)
            .ok_or(EmailError::MessageNotFound(id))?;
        message.seen = true;
        Ok(())
    }

    async fn close(&mut self) {
        self.state.lock().unwrap().closed += 1;
    }
}

pub fn credential(username: &str) -> AccountCredential {
    AccountCredential::new(username, "secret")
}

/// A single-part text message without attachments.
pub fn plain_message(subject: &str, body: &str) -> Vec<u8> {
    format!(
        "From: sender@example.com\r\n\
         Subject: {subject}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         {body}\r\n"
    )
    .into_bytes()
}

/// A multipart/mixed message with a text part and one base64 attachment.
pub fn message_with_attachment(
    subject: &str,
    filename: &str,
    content_type: &str,
    base64_body: &str,
) -> Vec<u8> {
    format!(
        "From: sender@example.com\r\n\
         Subject: {subject}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"SEP\"\r\n\
         \r\n\
         --SEP\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         See attached.\r\n\
         --SEP\r\n\
         Content-Type: {content_type}; name=\"{filename}\"\r\n\
         Content-Disposition: attachment; filename=\"{filename}\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         {base64_body}\r\n\
         --SEP--\r\n"
    )
    .into_bytes()
}

/// `%PDF-1.4 test`
pub const PDF_BASE64: &str = "JVBERi0xLjQgdGVzdA==";
pub const PDF_BYTES: &[u8] = b"%PDF-1.4 test";

/// `[0x00, 0x01, 0x02, 0xFF]`
pub const BINARY_BASE64: &str = "AAEC/w==";
pub const BINARY_BYTES: &[u8] = &[0x00, 0x01, 0x02, 0xFF];
