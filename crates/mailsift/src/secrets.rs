//! Mailbox password resolution.
//!
//! An account's password may come from one of three places, checked in
//! this order:
//!
//! 1. **Inline value** in the config file (`password`), handy for local runs
//! 2. **File** (`passwordFile`), e.g. a mounted container secret
//! 3. **Environment variable** (`passwordEnvVar`)

use secrecy::SecretString;

/// Error type for password resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No password source provided (need one of: password, passwordFile, passwordEnvVar)")]
    NoSourceProvided,

    #[error("Failed to read password from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// The configured places a single password may be read from.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretSource<'a> {
    pub value: Option<&'a str>,
    pub file: Option<&'a str>,
    pub env_var: Option<&'a str>,
}

impl<'a> SecretSource<'a> {
    /// Returns true when at least one non-empty source is configured.
    pub fn is_configured(&self) -> bool {
        [self.value, self.file, self.env_var]
            .iter()
            .any(|s| non_empty(*s).is_some())
    }

    /// Resolves the password from the first non-empty source.
    ///
    /// File contents and environment values are trimmed, since both tend to
    /// carry a trailing newline.
    pub fn resolve(&self) -> Result<SecretString> {
        if let Some(value) = non_empty(self.value) {
            return Ok(SecretString::from(value.to_string()));
        }

        if let Some(path) = non_empty(self.file) {
            let expanded = expand_home(path);
            return std::fs::read_to_string(&expanded)
                .map(|content| SecretString::from(content.trim().to_string()))
                .map_err(|source| SecretError::FileReadError {
                    path: expanded,
                    source,
                });
        }

        if let Some(name) = non_empty(self.env_var) {
            return match std::env::var(name) {
                Ok(value) => Ok(SecretString::from(value.trim().to_string())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            };
        }

        Err(SecretError::NoSourceProvided)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Expands a leading `~` to the current user's home directory.
///
/// `~user/...` is not supported.
fn expand_home(path: &str) -> String {
    if path != "~" && !path.starts_with("~/") {
        return path.to_string();
    }
    match dirs::home_dir() {
        Some(home) => path.replacen('~', &home.to_string_lossy(), 1),
        None => path.to_string(),
    }
}
