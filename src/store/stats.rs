//! Read-only stats snapshot for health and metrics endpoints.

use serde::Serialize;

/// Point-in-time view of the access layer's counters.
///
/// Fields are read independently without a shared lock; each value is
/// consistent on its own but the snapshot is not atomic across fields. Good
/// enough for dashboards, not for correctness-critical decisions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Deployment shape the client was built for.
    pub topology: &'static str,
    /// Resolved connection pool size.
    pub pool_size: usize,
    /// In-flight non-pipelined commands.
    pub processing: u32,
    /// In-flight pipeline batches.
    pub pipe_processing: u32,
    /// Lifetime count of dispatched operations.
    pub total: u64,
    /// Physical connections established by this layer.
    pub connections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_for_health_endpoints() {
        let stats = StoreStats {
            topology: "single",
            pool_size: 1,
            processing: 2,
            pipe_processing: 1,
            total: 40,
            connections: 1,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["topology"], "single");
        assert_eq!(json["processing"], 2);
        assert_eq!(json["pipeProcessing"], 1);
        assert_eq!(json["total"], 40);
    }
}
