//! Typed JSON cache over the store.
//!
//! Thin convenience layer for callers that cache serde values: keys get a
//! shared prefix, values are JSON-encoded, and a missing key surfaces as the
//! nil sentinel so cache-miss fallthrough stays a non-error path.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::{RedisStore, StoreError};

#[derive(Clone)]
pub struct RedisCache {
    store: RedisStore,
    prefix: String,
    default_ttl: Duration,
}

impl RedisCache {
    pub fn new(store: RedisStore, prefix: impl Into<String>, default_ttl: Duration) -> Self {
        RedisCache {
            store,
            prefix: prefix.into(),
            default_ttl,
        }
    }

    fn key(&self, key: &str) -> String {
        prefixed(&self.prefix, key)
    }

    /// Fetch and decode a cached value. A missing key is
    /// [`StoreError::Nil`]; callers treat it as a cache miss, not a failure.
    pub async fn get_struct<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let raw = self.store.get(&self.key(key)).await?;
        serde_json::from_slice(&raw).map_err(StoreError::Codec)
    }

    /// Encode and store a value with the default TTL.
    pub async fn set_struct<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.set_struct_ttl(key, value, self.default_ttl).await
    }

    /// Encode and store a value with an explicit TTL.
    pub async fn set_struct_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(value).map_err(StoreError::Codec)?;
        self.store.set(&self.key(key), &raw, ttl).await
    }

    pub async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.store.del(&self.key(key)).await
    }
}

fn prefixed(prefix: &str, key: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + key.len());
    out.push_str(prefix);
    out.push_str(key);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefixing() {
        assert_eq!(prefixed("app:", "user:1"), "app:user:1");
        assert_eq!(prefixed("", "user:1"), "user:1");
    }
}
