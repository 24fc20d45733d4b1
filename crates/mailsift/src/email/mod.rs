//! Mailbox access and message handling.
//!
//! A session lists and fetches unread mail, the charset normalizer and
//! parser turn raw bytes into a structured message, and the scanner drives
//! one account through the whole cycle.

pub mod charset;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod session;

pub use error::EmailError;
pub use parser::{Attachment, ParsedMessage};
pub use scanner::MailboxScanner;
pub use session::{
    ImapConnector, ImapSession, MailboxConnector, MailboxSession, MessageId, UnreadListing,
};
