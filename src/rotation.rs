// src/rotation.rs
//! Round-robin credential pool for outbound API keys.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;

use crate::error::AggregatorError;

/// When credentials are drawn from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyPolicy {
    /// One credential shared by every source of a request.
    #[default]
    PerRequest,
    /// A fresh credential for every source call.
    PerSource,
}

impl std::str::FromStr for KeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "per-request" | "request" => Ok(KeyPolicy::PerRequest),
            "per-source" | "source" => Ok(KeyPolicy::PerSource),
            other => Err(format!("unknown key policy '{other}'")),
        }
    }
}

/// Ordered credentials plus a cursor that always stays in `[0, len)`.
#[derive(Debug)]
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Return the credential under the cursor and advance it, wrapping to 0.
    ///
    /// The advance is a single atomic read-modify-write, so concurrent
    /// requests never observe the same cursor value.
    pub fn next_key(&self) -> Result<String, AggregatorError> {
        let len = self.keys.len();
        if len == 0 {
            return Err(AggregatorError::Configuration(
                "credential pool is empty".to_string(),
            ));
        }
        let prev = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_else(|c| c);
        Ok(self.keys[prev % len].clone())
    }
}

/// Short, non-reversible tag for a credential so logs never carry the key itself.
pub fn fingerprint(key: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(8);
    for b in digest.iter().take(4) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
