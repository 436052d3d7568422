//! Presence checks for the secrets the deployed bot needs.

use crate::{DeployError, DeployResult};
use std::fmt;
use tracing::warn;

/// Variables that must be set before anything is deployed, in check order.
pub const REQUIRED_CREDENTIALS: [&str; 5] = [
    "OPENAI_API_KEY",
    "TWITTER_CONSUMER_KEY",
    "TWITTER_CONSUMER_SECRET",
    "TWITTER_ACCESS_TOKEN",
    "TWITTER_ACCESS_TOKEN_SECRET",
];

/// Validated credential values, kept in `REQUIRED_CREDENTIALS` order.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    entries: Vec<(String, String)>,
}

impl CredentialSet {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(k, _)| format!("{}=<redacted>", k)))
            .finish()
    }
}

/// Check every required credential through `lookup`.
///
/// Fails on the first name that is unset or empty, so the operator sees
/// exactly which variable to fix. Only presence is checked: a value made of
/// whitespace is accepted with a warning.
pub fn validate_credentials<F>(lookup: F) -> DeployResult<CredentialSet>
where
    F: Fn(&str) -> Option<String>,
{
    let mut entries = Vec::with_capacity(REQUIRED_CREDENTIALS.len());

    for name in REQUIRED_CREDENTIALS {
        match lookup(name) {
            Some(value) if !value.is_empty() => {
                if value.trim().is_empty() {
                    warn!("{} is set but contains only whitespace", name);
                }
                entries.push((name.to_string(), value));
            }
            _ => {
                return Err(DeployError::MissingCredential {
                    name: name.to_string(),
                })
            }
        }
    }

    Ok(CredentialSet { entries })
}
