pub mod audit;
pub mod cache;
pub mod config;
pub mod observability;
pub mod session;
pub mod store;

pub use cache::RedisCache;
pub use config::{AppConfig, RedisConfig, RunEnv};
pub use session::RedisSession;
pub use store::{RedisStore, StoreError, StorePipeline, StoreStats, TopologyKind};
