//! The store client facade.
//!
//! A `RedisStore` is constructed once at startup from the validated
//! configuration and handed to whatever needs it; it is cheap to clone and
//! every clone shares the same gate, hook and connection. Each operation runs
//! the same path: admission check, counter/timestamp bookkeeping, dispatch
//! over the topology connection, then slow/error observation and result
//! reporting. Errors are decorated with observability, never swallowed, and
//! never retried here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redis::{Cmd, ErrorKind, FromRedisValue, RedisError, Value};

use crate::config::RedisConfig;

use super::error::StoreError;
use super::gate::{AdmissionGate, OpKind};
use super::hook::CommandHook;
use super::pipeline::StorePipeline;
use super::stats::StoreStats;
use super::topology::{self, StoreConnection, TopologyKind};

/// Health checks answer within this window or fail.
const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// Handle to the remote store. Lives for the whole process.
#[derive(Clone)]
pub struct RedisStore {
    conn: StoreConnection,
    gate: Arc<AdmissionGate>,
    hook: CommandHook,
    connections: Arc<AtomicU64>,
    pool_size: usize,
}

impl RedisStore {
    /// Build the client for the configured topology and attach the admission
    /// gate and instrumentation hook. Configuration problems are fatal and
    /// surface before any network I/O.
    pub async fn connect(cfg: &RedisConfig) -> Result<Self, StoreError> {
        let gate = Arc::new(AdmissionGate::new(cfg.max_processing));
        let hook = CommandHook::new(Arc::clone(&gate), cfg.slow());
        let connections = Arc::new(AtomicU64::new(0));
        let conn = topology::connect(cfg, Arc::clone(&connections)).await?;
        Ok(RedisStore {
            conn,
            gate,
            hook,
            connections,
            pool_size: topology::resolve_pool_size(cfg),
        })
    }

    pub fn topology(&self) -> TopologyKind {
        self.conn.kind()
    }

    /// Run one command through the gate, the hook and the topology
    /// connection. All typed operations below go through here.
    pub async fn execute<T: FromRedisValue>(
        &self,
        name: &'static str,
        cmd: &Cmd,
    ) -> Result<T, StoreError> {
        self.gate.allow()?;
        let token = self.hook.begin(OpKind::Command);
        let result = self.conn.query::<T>(cmd).await.map_err(StoreError::from);
        let error_text = result.as_ref().err().map(ToString::to_string);
        self.hook.finish(token, name, error_text.as_deref());
        self.gate.report_result(&result);
        result
    }

    /// Dispatch a pipelined batch. One admission check covers the whole
    /// batch; the hook reports it as a single comma-joined event.
    pub async fn pipeline(&self, pipe: &StorePipeline) -> Result<Vec<Value>, StoreError> {
        if pipe.is_empty() {
            return Ok(Vec::new());
        }
        self.gate.allow()?;
        let token = self.hook.begin(OpKind::Pipeline);
        let result = self
            .conn
            .query_pipeline::<Vec<Value>>(pipe.inner())
            .await
            .map_err(StoreError::from);
        let error_text = result.as_ref().err().map(ToString::to_string);
        self.hook
            .finish(token, &pipe.command_names(), error_text.as_deref());
        self.gate.report_result(&result);
        result
    }

    /// Fetch a key, with the "key absent" sentinel mapped to
    /// [`StoreError::Nil`].
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.get_opt(key).await?.ok_or(StoreError::Nil)
    }

    /// Fetch a key; a missing key is `None`, not an error.
    pub async fn get_opt(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.execute("get", &cmd).await
    }

    /// Store a value. A zero `ttl` stores without expiry.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }
        self.execute("set", &cmd).await
    }

    /// Store a value only when the key does not exist yet. Returns whether
    /// the write happened.
    pub async fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }
        cmd.arg("NX");
        let reply: Option<String> = self.execute("set", &cmd).await?;
        Ok(reply.is_some())
    }

    pub async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.execute("del", &cmd).await
    }

    pub async fn incr(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut cmd = redis::cmd("INCRBY");
        cmd.arg(key).arg(delta);
        self.execute("incrby", &cmd).await
    }

    /// Remaining time to live, `None` when the key has no expiry or does not
    /// exist.
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut cmd = redis::cmd("PTTL");
        cmd.arg(key);
        let millis: i64 = self.execute("pttl", &cmd).await?;
        if millis < 0 {
            return Ok(None);
        }
        Ok(Some(Duration::from_millis(millis as u64)))
    }

    /// Health check with a short fixed timeout.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let cmd = redis::cmd("PING");
        match tokio::time::timeout(PING_TIMEOUT, self.execute::<String>("ping", &cmd)).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(StoreError::Redis(RedisError::from((
                ErrorKind::IoError,
                "redis ping timed out",
            )))),
        }
    }

    /// Snapshot of the live counters for health/metrics endpoints. Values
    /// are read independently; no cross-field atomicity is promised.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            topology: self.conn.kind().as_str(),
            pool_size: self.pool_size,
            processing: self.gate.processing(),
            pipe_processing: self.gate.pipe_processing(),
            total: self.gate.total(),
            connections: self.connections.load(Ordering::SeqCst),
        }
    }

    /// The shared admission gate, exposed for callers that want to probe
    /// saturation without issuing a command.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}
