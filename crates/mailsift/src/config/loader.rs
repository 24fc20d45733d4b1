use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::storage::account_local_part;

/// Environment variable consulted when no `--config` flag is given.
pub const CONFIG_ENV_VAR: &str = "MAILSIFT_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Platform config location, e.g. `~/.config/mailsift/config.yaml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mailsift").join("config.yaml"))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::Validation {
            message: "server.port must not be 0".to_string(),
        });
    }

    if config.poll_interval == 0 {
        return Err(ConfigError::Validation {
            message: "pollInterval must be at least 1 second".to_string(),
        });
    }

    if config.mailbox.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "mailbox must not be empty".to_string(),
        });
    }

    if config.accounts.is_empty() {
        return Err(ConfigError::Validation {
            message: "at least one account is required".to_string(),
        });
    }

    let mut usernames = HashSet::new();
    let mut local_parts = HashSet::new();
    for account in &config.accounts {
        if account.username.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "account username must not be empty".to_string(),
            });
        }

        if !usernames.insert(account.username.as_str()) {
            return Err(ConfigError::InvalidAccount {
                username: account.username.clone(),
                reason: "Duplicate username".to_string(),
            });
        }

        // Two accounts sharing a local part would write into the same subtree.
        if !local_parts.insert(account_local_part(&account.username)) {
            return Err(ConfigError::InvalidAccount {
                username: account.username.clone(),
                reason: "Another account already uses this local part".to_string(),
            });
        }

        if !account.secret_source().is_configured() {
            return Err(ConfigError::InvalidAccount {
                username: account.username.clone(),
                reason: "One of password, passwordFile or passwordEnvVar is required".to_string(),
            });
        }
    }

    Ok(())
}
