use serde::{Deserialize, Serialize};

use crate::secrets::SecretSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Root of the attachment tree.
    #[serde(default = "default_files_dir")]
    pub files_dir: String,

    /// Seconds to wait between passes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Run one task per account instead of visiting accounts in turn.
    #[serde(default)]
    pub concurrent_accounts: bool,

    /// Mailbox selected on every account.
    #[serde(default = "default_mailbox")]
    pub mailbox: String,

    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One mailbox to scan. Exactly one password source should be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    pub username: String,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env_var: Option<String>,
}

impl AccountConfig {
    pub fn secret_source(&self) -> SecretSource<'_> {
        SecretSource {
            value: self.password.as_deref(),
            file: self.password_file.as_deref(),
            env_var: self.password_env_var.as_deref(),
        }
    }
}

fn default_host() -> String {
    "imap.mail.ru".to_string()
}

fn default_port() -> u16 {
    993
}

fn default_files_dir() -> String {
    "files".to_string()
}

fn default_poll_interval() -> u64 {
    1800 // 30 minutes
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}
