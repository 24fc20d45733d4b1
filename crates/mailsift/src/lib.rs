pub mod categorizer;
pub mod config;
pub mod email;
pub mod error;
pub mod report;
pub mod secrets;
pub mod storage;
pub mod telemetry;
pub mod worker;

pub use categorizer::{classify, DEFAULT_CATEGORY};
pub use config::{
    load_config, load_config_from_str, AccountCredential, Config, CredentialProvider,
};
pub use email::{
    Attachment, EmailError, ImapConnector, MailboxConnector, MailboxScanner, MailboxSession,
    MessageId, ParsedMessage, UnreadListing,
};
pub use error::{ConfigError, MailsiftError, Result, StorageError};
pub use report::{AccountReport, AccountStatus, MessageReport, MessageStatus, PassReport, Stage};
pub use secrets::SecretError;
pub use storage::{account_local_part, AttachmentStore};
pub use worker::Poller;
