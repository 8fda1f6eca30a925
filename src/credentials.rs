/*!
 * Credential loading for replica connections.
 *
 * Each replica host has its own secrets file under a credentials directory.
 * The file is line oriented: `user=<value>` and `password=<value>` are the
 * only recognised lines, everything else (blank lines, comments, option-file
 * section headers) is skipped.
 */

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::CredentialError;

static KEY_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(user|password)\s*=\s*(.*?)\s*$").expect("credential line pattern is valid")
});

/// Username/password pair for one host
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    user: String,
    password: String,
}

impl Credential {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Locates and parses per-host credential files
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Credential file for `host`: `<dir>/<host>.cnf` with unsafe characters replaced
    pub fn path_for(&self, host: &str) -> PathBuf {
        let file_stem: String = host
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.cnf", file_stem))
    }

    /// Load the credential for `host`
    pub fn load(&self, host: &str) -> Result<Credential, CredentialError> {
        Self::load_from_path(self.path_for(host))
    }

    /// Load a credential from an explicit file
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Credential, CredentialError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CredentialError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Loading credentials from {:?}", path);
        parse_credentials(&content).map_err(|missing| CredentialError::Malformed {
            path: path.to_path_buf(),
            missing,
        })
    }
}

/// Parse credential file content, returning the missing keys on failure
pub fn parse_credentials(content: &str) -> Result<Credential, Vec<&'static str>> {
    let mut user = None;
    let mut password = None;

    for line in content.lines() {
        let Some(captures) = KEY_VALUE.captures(line) else {
            continue;
        };
        let value = unquote(&captures[2]).to_string();
        match &captures[1] {
            "user" => user = Some(value),
            "password" => password = Some(value),
            _ => {}
        }
    }

    match (user, password) {
        (Some(user), Some(password)) => Ok(Credential { user, password }),
        (user, password) => {
            let mut missing = Vec::new();
            if user.is_none() {
                missing.push("user");
            }
            if password.is_none() {
                missing.push("password");
            }
            Err(missing)
        }
    }
}

// Option files allow 'value' or "value"
fn unquote(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
