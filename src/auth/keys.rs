// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key resolution.
//!
//! The authenticator only depends on [`KeyLookup`]. [`KeyStore`] is the
//! in-process implementation: PEM material keyed by key id, loaded once at
//! startup from a directory.
//!
//! ## Directory layout
//!
//! ```text
//! keys/
//!   <kid>.pem       # RSA private key (issuance only)
//!   <kid>.pub.pem   # RSA public key (verification)
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

const PUBLIC_SUFFIX: &str = ".pub.pem";
const PRIVATE_SUFFIX: &str = ".pem";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("no key registered for kid {0:?}")]
    NotFound(String),
    #[error("kid {kid:?} has no {half} key")]
    Missing { kid: String, half: &'static str },
    #[error("reading key directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("key resolver unavailable: {0}")]
    Unavailable(String),
}

/// Maps a key id to PEM encoded key material.
#[async_trait]
pub trait KeyLookup: Send + Sync {
    /// Key used to verify tokens signed under `kid`.
    async fn public_key(&self, kid: &str) -> Result<String, KeyError>;

    /// Key used to sign tokens under `kid`.
    async fn private_key(&self, kid: &str) -> Result<String, KeyError>;
}

#[derive(Clone, Default)]
struct KeyPair {
    private_pem: Option<String>,
    public_pem: Option<String>,
}

/// In-memory key store.
///
/// Key material is intentionally not printable via Debug.
#[derive(Clone, Default)]
pub struct KeyStore {
    keys: HashMap<String, KeyPair>,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kids: Vec<&String> = self.keys.keys().collect();
        kids.sort();
        f.debug_struct("KeyStore").field("kids", &kids).finish()
    }
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a full key pair.
    pub fn with_key_pair(
        mut self,
        kid: impl Into<String>,
        private_pem: impl Into<String>,
        public_pem: impl Into<String>,
    ) -> Self {
        self.keys.insert(
            kid.into(),
            KeyPair {
                private_pem: Some(private_pem.into()),
                public_pem: Some(public_pem.into()),
            },
        );
        self
    }

    /// Register a verification-only key.
    pub fn with_public_key(mut self, kid: impl Into<String>, public_pem: impl Into<String>) -> Self {
        self.keys.entry(kid.into()).or_default().public_pem = Some(public_pem.into());
        self
    }

    /// Load every `*.pem` / `*.pub.pem` file in `dir`. Other files are ignored.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, KeyError> {
        let dir = dir.as_ref();
        let io_err = |source| KeyError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut store = Self::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let (kid, public) = if let Some(kid) = name.strip_suffix(PUBLIC_SUFFIX) {
                (kid.to_string(), true)
            } else if let Some(kid) = name.strip_suffix(PRIVATE_SUFFIX) {
                (kid.to_string(), false)
            } else {
                continue;
            };

            let pem = std::fs::read_to_string(&path).map_err(|source| KeyError::Io {
                path: path.display().to_string(),
                source,
            })?;

            let pair = store.keys.entry(kid).or_default();
            if public {
                pair.public_pem = Some(pem);
            } else {
                pair.private_pem = Some(pem);
            }
        }

        tracing::info!(keys = store.keys.len(), dir = %dir.display(), "Loaded signing keys");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn pair(&self, kid: &str) -> Result<&KeyPair, KeyError> {
        self.keys
            .get(kid)
            .ok_or_else(|| KeyError::NotFound(kid.to_string()))
    }
}

#[async_trait]
impl KeyLookup for KeyStore {
    async fn public_key(&self, kid: &str) -> Result<String, KeyError> {
        self.pair(kid)?.public_pem.clone().ok_or(KeyError::Missing {
            kid: kid.to_string(),
            half: "public",
        })
    }

    async fn private_key(&self, kid: &str) -> Result<String, KeyError> {
        self.pair(kid)?.private_pem.clone().ok_or(KeyError::Missing {
            kid: kid.to_string(),
            half: "private",
        })
    }
}
