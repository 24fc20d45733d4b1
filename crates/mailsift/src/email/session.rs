//! Mailbox sessions over IMAP.
//!
//! [`MailboxConnector`] opens sessions and [`MailboxSession`] is one open,
//! authenticated connection. The ingestion cycle only sees these traits;
//! [`ImapConnector`] is the production implementation.

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::{AccountCredential, ServerConfig};

use super::error::{EmailError, Result};

/// Server-assigned sequence number, only meaningful inside the session
/// that produced it.
pub type MessageId = u32;

/// Result of selecting the mailbox and searching it for unseen mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadListing {
    /// Messages in the mailbox, read or not.
    pub total: u32,
    /// Unseen message ids in ascending order.
    pub unread: Vec<MessageId>,
}

/// One open, authenticated mailbox connection.
///
/// Not meant for concurrent use: every call completes before the next one
/// is issued.
#[async_trait]
pub trait MailboxSession: Send {
    /// Selects the mailbox and returns its size plus the unseen ids.
    async fn list_unread(&mut self) -> Result<UnreadListing>;

    /// Fetches the full raw message for `id`.
    async fn fetch(&mut self, id: MessageId) -> Result<Vec<u8>>;

    /// Adds the `\Seen` flag to `id`. Flagging a seen message again is
    /// harmless.
    async fn mark_read(&mut self, id: MessageId) -> Result<()>;

    /// Logs out. Failures are logged, never returned.
    async fn close(&mut self);
}

/// Opens [`MailboxSession`]s for credentials.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    async fn open(&self, credential: &AccountCredential) -> Result<Box<dyn MailboxSession>>;
}

type AsyncTcpStream = async_io::Async<std::net::TcpStream>;

type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// Connects to an IMAPS server and logs in with a password.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    server: ServerConfig,
    mailbox: String,
}

impl ImapConnector {
    pub fn new(server: ServerConfig, mailbox: impl Into<String>) -> Self {
        Self {
            server,
            mailbox: mailbox.into(),
        }
    }

    async fn connect_tls(&self) -> Result<TlsStream> {
        let addr = self.server.address();
        info!("Connecting to IMAP server at {}", addr);

        let std_stream = std::net::TcpStream::connect(&addr)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;
        let tcp_stream = async_io::Async::new(std_stream)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;

        Ok(TlsConnector::new()
            .connect(&self.server.host, tcp_stream)
            .await?)
    }
}

#[async_trait]
impl MailboxConnector for ImapConnector {
    async fn open(&self, credential: &AccountCredential) -> Result<Box<dyn MailboxSession>> {
        let tls_stream = self.connect_tls().await?;
        let client = async_imap::Client::new(tls_stream);

        let session = client
            .login(&credential.username, credential.password.expose_secret())
            .await
            .map_err(|(e, _)| EmailError::AuthenticationFailed(e.to_string()))?;

        info!("Authenticated as {}", credential.username);
        Ok(Box::new(ImapSession {
            session: Some(session),
            mailbox: self.mailbox.clone(),
            account: credential.username.clone(),
        }))
    }
}

/// A logged-in IMAP session bound to one account.
pub struct ImapSession {
    session: Option<Session<TlsStream>>,
    mailbox: String,
    account: String,
}

impl ImapSession {
    fn live(&mut self) -> Result<&mut Session<TlsStream>> {
        self.session
            .as_mut()
            .ok_or_else(|| EmailError::ConnectionFailed("Session already closed".to_string()))
    }
}

#[async_trait]
impl MailboxSession for ImapSession {
    async fn list_unread(&mut self) -> Result<UnreadListing> {
        let mailbox = self.mailbox.clone();
        let session = self.live()?;

        // SELECT rather than EXAMINE: the later STORE needs a writable mailbox.
        let selected = session
            .select(&mailbox)
            .await
            .map_err(|e| EmailError::ProtocolError(format!("SELECT {}: {}", mailbox, e)))?;

        let mut unread: Vec<MessageId> = session
            .search("UNSEEN")
            .await
            .map_err(|e| EmailError::ProtocolError(format!("SEARCH UNSEEN: {}", e)))?
            .into_iter()
            .collect();
        unread.sort_unstable();

        debug!(
            "Mailbox '{}' has {} messages, {} unseen",
            mailbox,
            selected.exists,
            unread.len()
        );
        Ok(UnreadListing {
            total: selected.exists,
            unread,
        })
    }

    async fn fetch(&mut self, id: MessageId) -> Result<Vec<u8>> {
        let session = self.live()?;
        debug!("Fetching message {}", id);

        // BODY.PEEK[] leaves \Seen alone; mark_read owns the flag.
        let fetches: Vec<_> = session
            .fetch(id.to_string(), "(ENVELOPE BODYSTRUCTURE BODY.PEEK[])")
            .await
            .map_err(|e| EmailError::FetchFailed {
                id,
                reason: e.to_string(),
            })?
            .try_collect()
            .await
            .map_err(|e| EmailError::FetchFailed {
                id,
                reason: e.to_string(),
            })?;

        fetches
            .iter()
            .filter(|fetch| fetch.message == id)
            .find_map(|fetch| fetch.body())
            .map(<[u8]>::to_vec)
            .ok_or(EmailError::MessageNotFound(id))
    }

    async fn mark_read(&mut self, id: MessageId) -> Result<()> {
        let session = self.live()?;

        let _updates: Vec<_> = session
            .store(id.to_string(), "+FLAGS (\\Seen)")
            .await
            .map_err(|e| EmailError::FlagFailed {
                id,
                reason: e.to_string(),
            })?
            .try_collect()
            .await
            .map_err(|e| EmailError::FlagFailed {
                id,
                reason: e.to_string(),
            })?;

        debug!("Message {} marked as read", id);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            info!("Logging out {}", self.account);
            if let Err(e) = session.logout().await {
                warn!("Logout failed for {}: {}", self.account, e);
            }
        }
    }
}

impl Drop for ImapSession {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!(
                "Session for {} dropped without logout - connection will be closed",
                self.account
            );
        }
    }
}
