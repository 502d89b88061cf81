//! Topology selection and connection construction.
//!
//! Exactly one of three client variants is built from the validated
//! configuration: a single-node connection manager, a clustered connection, or
//! a sentinel-backed primary connection with automatic failover. The decision
//! itself is pure so it can be tested without touching the network.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use redis::sentinel::{SentinelClient, SentinelNodeConnectionInfo, SentinelServerType};
use redis::{Cmd, ConnectionAddr, ConnectionInfo, FromRedisValue, RedisConnectionInfo, RedisResult};

use crate::config::RedisConfig;

use super::error::StoreError;

/// Deployment shape of the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyKind {
    Single,
    Cluster,
    Failover,
}

impl TopologyKind {
    /// A configured primary name forces failover mode regardless of how many
    /// addresses are listed; otherwise the address count decides.
    pub fn select(master: Option<&str>, addr_count: usize) -> Self {
        if master.is_some() {
            TopologyKind::Failover
        } else if addr_count > 1 {
            TopologyKind::Cluster
        } else {
            TopologyKind::Single
        }
    }

    pub fn of(cfg: &RedisConfig) -> Self {
        TopologyKind::select(cfg.master.as_deref(), cfg.addrs.len())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::Single => "single",
            TopologyKind::Cluster => "cluster",
            TopologyKind::Failover => "failover",
        }
    }
}

/// The constructed concrete client. Cheap to clone; the underlying
/// connections are multiplexed and manage their own reconnection.
#[derive(Clone)]
pub enum StoreConnection {
    Single(ConnectionManager),
    Cluster(ClusterConnection),
    Failover(SentinelFailover),
}

impl std::fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StoreConnection::Single(_) => "StoreConnection::Single",
            StoreConnection::Cluster(_) => "StoreConnection::Cluster",
            StoreConnection::Failover(_) => "StoreConnection::Failover",
        })
    }
}

impl StoreConnection {
    pub fn kind(&self) -> TopologyKind {
        match self {
            StoreConnection::Single(_) => TopologyKind::Single,
            StoreConnection::Cluster(_) => TopologyKind::Cluster,
            StoreConnection::Failover(_) => TopologyKind::Failover,
        }
    }

    pub(crate) async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> RedisResult<T> {
        match self {
            StoreConnection::Single(mgr) => {
                let mut conn = mgr.clone();
                cmd.query_async(&mut conn).await
            }
            StoreConnection::Cluster(cluster) => {
                let mut conn = cluster.clone();
                cmd.query_async(&mut conn).await
            }
            StoreConnection::Failover(failover) => {
                let mut conn = failover.connection().await?;
                let result = cmd.query_async(&mut conn).await;
                failover.invalidate_on_error(&result).await;
                result
            }
        }
    }

    pub(crate) async fn query_pipeline<T: FromRedisValue>(
        &self,
        pipe: &redis::Pipeline,
    ) -> RedisResult<T> {
        match self {
            StoreConnection::Single(mgr) => {
                let mut conn = mgr.clone();
                pipe.query_async(&mut conn).await
            }
            StoreConnection::Cluster(cluster) => {
                let mut conn = cluster.clone();
                pipe.query_async(&mut conn).await
            }
            StoreConnection::Failover(failover) => {
                let mut conn = failover.connection().await?;
                let result = pipe.query_async(&mut conn).await;
                failover.invalidate_on_error(&result).await;
                result
            }
        }
    }
}

/// Sentinel-backed primary connection.
///
/// The sentinel client resolves the current primary per acquisition; the
/// resolved connection is cached and dropped on connection-level errors so
/// the next operation re-resolves. Commands are never retried here.
#[derive(Clone)]
pub struct SentinelFailover {
    client: Arc<tokio::sync::Mutex<SentinelClient>>,
    cached: Arc<tokio::sync::Mutex<Option<MultiplexedConnection>>>,
    connections: Arc<AtomicU64>,
}

impl SentinelFailover {
    fn new(
        nodes: Vec<ConnectionInfo>,
        master: String,
        cfg: &RedisConfig,
        connections: Arc<AtomicU64>,
    ) -> Result<Self, StoreError> {
        let node_info = SentinelNodeConnectionInfo {
            tls_mode: None,
            redis_connection_info: Some(redis_info(cfg)),
        };
        let client =
            SentinelClient::build(nodes, master, Some(node_info), SentinelServerType::Master)?;
        Ok(SentinelFailover {
            client: Arc::new(tokio::sync::Mutex::new(client)),
            cached: Arc::new(tokio::sync::Mutex::new(None)),
            connections,
        })
    }

    async fn connection(&self) -> RedisResult<MultiplexedConnection> {
        let mut cached = self.cached.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.lock().await.get_async_connection().await?;
        self.connections.fetch_add(1, Ordering::SeqCst);
        tracing::info!(category = "redisConnect", "redis primary connection established");
        *cached = Some(conn.clone());
        Ok(conn)
    }

    async fn invalidate_on_error<T>(&self, result: &RedisResult<T>) {
        if let Err(err) = result {
            if err.is_connection_dropped() || err.is_io_error() {
                self.cached.lock().await.take();
            }
        }
    }
}

/// Build the client for the configured topology.
///
/// Fatal on configuration problems, before any network I/O. Logs one
/// `connecting` event with the address list (never credentials) and a
/// `connected` event per physical connection this layer establishes.
pub(crate) async fn connect(
    cfg: &RedisConfig,
    connections: Arc<AtomicU64>,
) -> Result<StoreConnection, StoreError> {
    cfg.validate()?;

    let kind = TopologyKind::of(cfg);
    tracing::info!(
        category = "redisConnect",
        addrs = ?cfg.addrs,
        topology = kind.as_str(),
        "connecting to redis"
    );

    let nodes = cfg
        .addrs
        .iter()
        .map(|addr| connection_info(addr, cfg))
        .collect::<Result<Vec<_>, _>>()?;

    match (&cfg.master, nodes.len()) {
        (Some(master), _) => Ok(StoreConnection::Failover(SentinelFailover::new(
            nodes,
            master.clone(),
            cfg,
            connections,
        )?)),
        (None, n) if n > 1 => {
            // Cluster connections are created lazily per node, so credentials
            // ride along in every node's connection info.
            let client = ClusterClientBuilder::new(nodes).build()?;
            let conn = client.get_async_connection().await?;
            connections.fetch_add(1, Ordering::SeqCst);
            tracing::info!(category = "redisConnect", "redis cluster connection established");
            Ok(StoreConnection::Cluster(conn))
        }
        (None, _) => {
            let Some(node) = nodes.into_iter().next() else {
                return Err(StoreError::Config("addrs is empty".to_string()));
            };
            let client = redis::Client::open(node)?;
            let conn = ConnectionManager::new(client).await?;
            connections.fetch_add(1, Ordering::SeqCst);
            tracing::info!(category = "redisConnect", "redis connection established");
            Ok(StoreConnection::Single(conn))
        }
    }
}

/// Effective pool size for the stats snapshot. The async clients multiplex a
/// single connection per node, so an unset size resolves to one.
pub(crate) fn resolve_pool_size(cfg: &RedisConfig) -> usize {
    if cfg.pool_size > 0 {
        cfg.pool_size
    } else {
        1
    }
}

fn redis_info(cfg: &RedisConfig) -> RedisConnectionInfo {
    RedisConnectionInfo {
        username: cfg.username.clone(),
        password: cfg.password.clone(),
        ..Default::default()
    }
}

fn connection_info(addr: &str, cfg: &RedisConfig) -> Result<ConnectionInfo, StoreError> {
    let (host, port) = crate::config::parse_addr(addr)?;
    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: redis_info(cfg),
    })
}
