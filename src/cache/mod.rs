//! Namespaced persistent key-value store shielding the vectorizers from
//! redundant network and API work.
//!
//! One store, three namespaces: `visual` (pixel vectors), `semantic`
//! (embedding vectors), `desc` (description strings). The namespace is an
//! explicit path component, not a key suffix, so the description cache and
//! the embedding cache can never collide on the same reference.
//!
//! Entries are created on first miss and never invalidated; staleness is an
//! accepted trade-off. Concurrent writers on disjoint keys land in distinct
//! files. Two concurrent misses on the *same* key may both compute and both
//! write the same value, which costs a duplicate computation but never
//! corrupts data.

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CollageError, CollageResult};

/// Namespace for cached visual vectors.
pub const NS_VISUAL: &str = "visual";
/// Namespace for cached semantic embedding vectors.
pub const NS_SEMANTIC: &str = "semantic";
/// Namespace for cached image descriptions.
pub const NS_DESCRIPTION: &str = "desc";

/// Persistent reference-keyed cache with an in-process read-through layer.
///
/// Values are stored as JSON, one file per entry, named by the SHA-256 of
/// the reference string (references are URLs and paths, not safe filenames).
pub struct VectorCache {
    root: PathBuf,
    // (namespace, key) -> serialized value, avoids re-reading hot entries
    memory: DashMap<(String, String), Vec<u8>>,
}

impl VectorCache {
    /// Open (or create) a cache rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> CollageResult<Self> {
        let root = root.as_ref().to_path_buf();
        for ns in [NS_VISUAL, NS_SEMANTIC, NS_DESCRIPTION] {
            fs::create_dir_all(root.join(ns)).map_err(|source| CollageError::Cache {
                key: ns.to_string(),
                source,
            })?;
        }
        Ok(Self {
            root,
            memory: DashMap::new(),
        })
    }

    /// Look up `key` in `namespace`. Returns `None` on a miss.
    pub fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> CollageResult<Option<T>> {
        let mem_key = (namespace.to_string(), key.to_string());
        if let Some(bytes) = self.memory.get(&mem_key) {
            let value = serde_json::from_slice(&bytes).map_err(|e| CollageError::Cache {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;
            return Ok(Some(value));
        }

        let path = self.entry_path(namespace, key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CollageError::Cache {
                    key: key.to_string(),
                    source,
                });
            }
        };

        let value = serde_json::from_slice(&bytes).map_err(|e| CollageError::Cache {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        self.memory.insert(mem_key, bytes);
        tracing::debug!(namespace, key, "cache hit from disk");
        Ok(Some(value))
    }

    /// Insert `value` for `key` in `namespace`, overwriting any previous entry.
    pub fn insert<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> CollageResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| CollageError::Cache {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        let path = self.entry_path(namespace, key);
        fs::write(&path, &bytes).map_err(|source| CollageError::Cache {
            key: key.to_string(),
            source,
        })?;
        self.memory
            .insert((namespace.to_string(), key.to_string()), bytes);
        tracing::debug!(namespace, key, "cache store");
        Ok(())
    }

    /// Existence check without deserializing the value.
    pub fn contains(&self, namespace: &str, key: &str) -> bool {
        self.memory
            .contains_key(&(namespace.to_string(), key.to_string()))
            || self.entry_path(namespace, key).exists()
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let mut name = String::with_capacity(69);
        for byte in digest {
            name.push_str(&format!("{byte:02x}"));
        }
        name.push_str(".json");
        self.root.join(namespace).join(name)
    }
}
