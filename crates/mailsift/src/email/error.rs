//! Mailbox and message error types.

use thiserror::Error;

/// Errors raised while talking to a mailbox or interpreting a message.
#[derive(Error, Debug)]
pub enum EmailError {
    /// Failed to reach the IMAP server.
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS handshake failed.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// LOGIN was rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// SELECT or SEARCH failed.
    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    /// FETCH failed on the wire.
    #[error("Failed to fetch message {id}: {reason}")]
    FetchFailed { id: u32, reason: String },

    /// The server answered FETCH without returning the message.
    #[error("Server returned no data for message {0}")]
    MessageNotFound(u32),

    /// STORE +FLAGS (\Seen) failed.
    #[error("Failed to mark message {id} as read: {reason}")]
    FlagFailed { id: u32, reason: String },

    /// The message could not be decoded or parsed.
    #[error("Failed to parse email: {0}")]
    ParseError(String),
}

impl From<async_native_tls::Error> for EmailError {
    fn from(err: async_native_tls::Error) -> Self {
        EmailError::TlsError(err.to_string())
    }
}

/// Result type for email operations.
pub type Result<T> = std::result::Result<T, EmailError>;
