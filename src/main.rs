use redis_gate::config::{AppConfig, RunEnv};
use redis_gate::observability;
use redis_gate::store::RedisStore;

#[tokio::main]
async fn main() {
    let env = RunEnv::from_env();
    observability::init(env);

    let cfg = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let store = match RedisStore::connect(&cfg.redis).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "cannot connect to redis");
            std::process::exit(1);
        }
    };

    if let Err(err) = store.ping().await {
        tracing::error!(error = %err, "redis ping failed");
        std::process::exit(1);
    }

    let stats = store.stats();
    tracing::info!(
        env = env.as_str(),
        topology = stats.topology,
        pool_size = stats.pool_size,
        total = stats.total,
        "redis store ready"
    );
}
