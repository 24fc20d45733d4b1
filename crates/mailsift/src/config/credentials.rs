use secrecy::SecretString;

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Login identifier and password for one mailbox.
#[derive(Debug)]
pub struct AccountCredential {
    pub username: String,
    pub password: SecretString,
}

impl AccountCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Anything that can hand out the set of accounts to scan.
pub trait CredentialProvider {
    fn credentials(&self) -> Result<Vec<AccountCredential>, ConfigError>;
}

impl CredentialProvider for Config {
    fn credentials(&self) -> Result<Vec<AccountCredential>, ConfigError> {
        self.accounts
            .iter()
            .map(|account| {
                let password = account.secret_source().resolve().map_err(|source| {
                    ConfigError::Credentials {
                        username: account.username.clone(),
                        source,
                    }
                })?;
                Ok(AccountCredential {
                    username: account.username.clone(),
                    password,
                })
            })
            .collect()
    }
}
