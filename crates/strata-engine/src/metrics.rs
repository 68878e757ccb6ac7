//! Prometheus counters for the engine's domain events (spec §9 design notes
//! carried forward as an ambient concern: observability, not gameplay).
//!
//! Mirrors the teacher's `nearcore::metrics` pattern of lazily-initialized,
//! process-global statics, adapted to the plain `prometheus` crate since the
//! teacher's own `near_o11y` wrapper isn't part of this workspace's stack.

use once_cell::sync::Lazy;
use prometheus::{HistogramVec, IntCounter, IntCounterVec};

pub static CHUNKS_MATERIALIZED: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "strata_chunks_materialized_total",
        "Chunks that have had ensure-chunk + generate + respawn-sweep run at least once"
    )
    .unwrap()
});

pub static NODES_SPAWNED: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!(
        "strata_nodes_spawned_total",
        "Resource nodes created by the generator, by node type",
        &["node_type"]
    )
    .unwrap()
});

pub static HARVESTS_ATTEMPTED: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("strata_harvests_attempted_total", "Harvest operations that entered the transaction")
        .unwrap()
});

pub static HARVESTS_SUCCEEDED: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("strata_harvests_succeeded_total", "Harvest operations that committed successfully").unwrap()
});

pub static HARVESTS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!(
        "strata_harvests_failed_total",
        "Harvest operations rejected, by error kind",
        &["reason"]
    )
    .unwrap()
});

pub static RESPAWN_SWEEP_SIZE: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("strata_respawn_sweep_nodes_total", "Nodes reactivated across all respawn sweeps").unwrap()
});

pub static REGEN_SWEEP_SIZE: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("strata_regen_sweep_nodes_total", "Nodes whose yield was incremented across all regeneration sweeps").unwrap()
});

pub static REQUEST_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    prometheus::register_histogram_vec!(
        "strata_request_latency_seconds",
        "HTTP request latency by route",
        &["route"],
        prometheus::exponential_buckets(0.001, 2.0, 16).unwrap()
    )
    .unwrap()
});

/// Labels a harvest rejection for the `strata_harvests_failed_total` counter.
pub fn harvest_failure_reason(err: &strata_primitives::HarvestError) -> &'static str {
    use strata_primitives::HarvestError::*;
    match err {
        NodeNotFound => "node_not_found",
        NodeNotActive => "node_not_active",
        NodeDepleted => "node_depleted",
        AlreadyHarvestedToday => "already_harvested_today",
    }
}
