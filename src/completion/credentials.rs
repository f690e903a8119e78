//! API credential rotation.

use crate::error::{LawDecoderError, Result};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A bearer token for the completion provider. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Arc::from(secret.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        write!(f, "Credential(****{})", tail)
    }
}

/// Ordered, fixed set of credentials with a shared round-robin cursor.
///
/// Concurrent queries share one pool, so the credential a query starts from
/// depends on how many were handed out before it. This spreads load across
/// keys; it is not a fairness guarantee.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Build a pool. At least one credential is required.
    pub fn new(credentials: Vec<Credential>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(LawDecoderError::Config(
                "No completion API credentials configured".to_string(),
            ));
        }
        Ok(Self {
            credentials,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Discover credentials from the process environment.
    ///
    /// Picks up `<prefix><N>` variables (e.g. `OPENROUTER_API_KEY1`), ordered
    /// by `N`. Empty values are skipped.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Discover credentials from an arbitrary set of variables.
    pub fn from_vars<I>(prefix: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix_upper = prefix.to_uppercase();
        let mut numbered: Vec<(u32, String)> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                let suffix = key.to_uppercase().strip_prefix(&prefix_upper)?.to_string();
                let index = suffix.parse::<u32>().ok()?;
                let value = value.trim().to_string();
                (!value.is_empty()).then_some((index, value))
            })
            .collect();
        numbered.sort_by_key(|(index, _)| *index);

        Self::new(
            numbered
                .into_iter()
                .map(|(_, value)| Credential::new(value))
                .collect(),
        )
        .map_err(|_| {
            LawDecoderError::Config(format!(
                "No completion API credentials found; set {}1, {}2, ...",
                prefix, prefix
            ))
        })
    }

    /// Hand out the next credential and its position in the pool.
    pub fn next_credential(&self) -> (usize, Credential) {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.credentials.len();
        (index, self.credentials[index].clone())
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
