//! Session storage surface for the HTTP layer.
//!
//! The routing/cookie middleware is an external collaborator; all it needs
//! from this crate is a key-value session backend with a TTL. Session keys
//! live under the `ss:` prefix.

use std::time::Duration;

use crate::store::{RedisStore, StoreError};

const SESSION_PREFIX: &str = "ss:";

#[derive(Clone)]
pub struct RedisSession {
    store: RedisStore,
    ttl: Duration,
}

impl RedisSession {
    pub fn new(store: RedisStore, ttl: Duration) -> Self {
        RedisSession { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(id: &str) -> String {
        format!("{}{}", SESSION_PREFIX, id)
    }

    /// Fetch session data; an unknown or expired session is `None`.
    pub async fn fetch(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.store.get_opt(&Self::key(id)).await
    }

    /// Store session data, resetting the TTL.
    pub async fn store(&self, id: &str, data: &[u8]) -> Result<(), StoreError> {
        self.store.set(&Self::key(id), data, self.ttl).await
    }

    /// Extend a live session without rewriting its data. Returns whether the
    /// session still existed.
    pub async fn refresh(&self, id: &str) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("PEXPIRE");
        cmd.arg(Self::key(id)).arg(self.ttl.as_millis() as u64);
        let updated: i64 = self.store.execute("pexpire", &cmd).await?;
        Ok(updated == 1)
    }

    pub async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        self.store.del(&Self::key(id)).await
    }
}
