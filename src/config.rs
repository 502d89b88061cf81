//! Configuration loading and validation.
//!
//! Settings come from a TOML file, from `REDIS_*` environment variables, or
//! both (environment wins). Validation happens once at load time; a broken
//! configuration is fatal before the process begins serving.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::store::StoreError;

const DEFAULT_SLOW_MS: u64 = 100;
const DEFAULT_MAX_PROCESSING: u32 = 1000;
const DEFAULT_REDIS_PORT: u16 = 6379;

/// Runtime environment, from `RUN_ENV`. Unset means dev.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnv {
    Dev,
    Test,
    Production,
}

impl RunEnv {
    pub fn from_env() -> Self {
        match env::var("RUN_ENV").as_deref() {
            Ok("production") => RunEnv::Production,
            Ok("test") => RunEnv::Test,
            _ => RunEnv::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, RunEnv::Dev)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunEnv::Dev => "dev",
            RunEnv::Test => "test",
            RunEnv::Production => "production",
        }
    }
}

/// Topology and limits for the store access layer. Immutable once loaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Store addresses as `host:port`. One address means a single node, more
    /// mean a cluster, and a configured `master` name forces failover mode.
    pub addrs: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Primary name for sentinel failover mode.
    pub master: Option<String>,
    /// Explicit pool size; 0 keeps the client library's default.
    pub pool_size: usize,
    /// Slow-operation threshold in milliseconds.
    pub slow_ms: u64,
    /// Ceiling on concurrently processing operations.
    pub max_processing: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            addrs: Vec::new(),
            username: None,
            password: None,
            master: None,
            pool_size: 0,
            slow_ms: DEFAULT_SLOW_MS,
            max_processing: DEFAULT_MAX_PROCESSING,
        }
    }
}

impl RedisConfig {
    /// Build from `REDIS_*` environment variables only.
    pub fn from_env() -> Result<Self, StoreError> {
        let mut cfg = RedisConfig::default();
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlay `REDIS_*` environment variables onto the current values.
    pub fn apply_env(&mut self) -> Result<(), StoreError> {
        if let Ok(addrs) = env::var("REDIS_ADDRS") {
            self.addrs = addrs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(username) = env::var("REDIS_USERNAME") {
            self.username = Some(username);
        }
        if let Ok(password) = env::var("REDIS_PASSWORD") {
            self.password = Some(password);
        }
        if let Ok(master) = env::var("REDIS_MASTER") {
            if !master.is_empty() {
                self.master = Some(master);
            }
        }
        if let Ok(value) = env::var("REDIS_POOL_SIZE") {
            self.pool_size = parse_number(&value, "REDIS_POOL_SIZE")?;
        }
        if let Ok(value) = env::var("REDIS_SLOW_MS") {
            self.slow_ms = parse_number(&value, "REDIS_SLOW_MS")?;
        }
        if let Ok(value) = env::var("REDIS_MAX_PROCESSING") {
            self.max_processing = parse_number(&value, "REDIS_MAX_PROCESSING")?;
        }
        Ok(())
    }

    /// Slow-operation threshold as a duration.
    pub fn slow(&self) -> Duration {
        Duration::from_millis(self.slow_ms)
    }

    /// Reject configurations the topology selector cannot work with. An
    /// empty address list or a malformed address is unrecoverable.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.addrs.is_empty() {
            return Err(StoreError::Config("addrs is empty".to_string()));
        }
        for addr in &self.addrs {
            parse_addr(addr)?;
        }
        Ok(())
    }
}

/// Whole-process configuration file shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub redis: RedisConfig,
}

impl AppConfig {
    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| StoreError::Config(format!("read {}: {}", path.display(), err)))?;
        toml::from_str(&raw)
            .map_err(|err| StoreError::Config(format!("parse {}: {}", path.display(), err)))
    }

    /// Load the process configuration: the file named by `CONFIG_FILE` when
    /// set, overlaid with `REDIS_*` environment variables.
    pub fn load() -> Result<Self, StoreError> {
        let mut cfg = match env::var("CONFIG_FILE") {
            Ok(path) => AppConfig::from_file(Path::new(&path))?,
            Err(_) => AppConfig::default(),
        };
        cfg.redis.apply_env()?;
        cfg.redis.validate()?;
        Ok(cfg)
    }
}

/// Split a `host:port` address, tolerating a `redis://` scheme prefix and a
/// missing port.
pub(crate) fn parse_addr(addr: &str) -> Result<(String, u16), StoreError> {
    let bare = addr.strip_prefix("redis://").unwrap_or(addr);
    if bare.is_empty() {
        return Err(StoreError::Config(format!("malformed address {:?}", addr)));
    }
    match bare.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(StoreError::Config(format!("malformed address {:?}", addr)));
            }
            let port: u16 = port.parse().map_err(|_| {
                StoreError::Config(format!("malformed port in address {:?}", addr))
            })?;
            Ok((host.to_string(), port))
        }
        None => Ok((bare.to_string(), DEFAULT_REDIS_PORT)),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Config(format!("{} is not numeric: {:?}", name, value)))
}
