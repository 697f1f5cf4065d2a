//! Prometheus metrics for podspread

use once_cell::sync::Lazy;
use prometheus::{
    opts, register_histogram, register_int_counter_vec, register_int_gauge, Histogram,
    IntCounterVec, IntGauge,
};

/// Housekeeping ticks by result (ok, error)
static TICKS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("podspread_ticks_total", "Total number of housekeeping ticks"),
        &["result"]
    )
    .expect("Failed to create ticks metric")
});

/// Tick duration histogram
static TICK_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "podspread_tick_duration_seconds",
        "Duration of housekeeping ticks",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to create tick_duration metric")
});

/// Per-group decisions
static DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("podspread_decisions_total", "Total number of per-group decisions"),
        &["decision"]
    )
    .expect("Failed to create decisions metric")
});

/// Readiness wait outcomes
static READINESS_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "podspread_readiness_outcomes_total",
            "Total number of replacement readiness waits by outcome"
        ),
        &["outcome"]
    )
    .expect("Failed to create readiness_outcomes metric")
});

/// Evictions currently awaiting a ready replacement
static PENDING_ACTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(opts!(
        "podspread_pending_actions",
        "Number of evictions awaiting a ready replacement"
    ))
    .expect("Failed to create pending_actions metric")
});

/// Workload groups seen in the last tick
static WORKLOAD_GROUPS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(opts!(
        "podspread_workload_groups",
        "Number of workload groups evaluated in the last tick"
    ))
    .expect("Failed to create workload_groups metric")
});

/// Metrics registry wrapper
pub struct MetricsRegistry;

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        // Force initialization of lazy statics
        let _ = &*TICKS;
        let _ = &*TICK_DURATION;
        let _ = &*DECISIONS;
        let _ = &*READINESS_OUTCOMES;
        let _ = &*PENDING_ACTIONS;
        let _ = &*WORKLOAD_GROUPS;
        Self
    }

    /// Record a finished tick
    pub fn observe_tick(&self, ok: bool, duration_secs: f64) {
        let result = if ok { "ok" } else { "error" };
        TICKS.with_label_values(&[result]).inc();
        TICK_DURATION.observe(duration_secs);
    }

    /// Increment the decision counter
    pub fn inc_decision(&self, decision: &str) {
        DECISIONS.with_label_values(&[decision]).inc();
    }

    /// Increment the readiness outcome counter
    pub fn inc_readiness_outcome(&self, outcome: &str) {
        READINESS_OUTCOMES.with_label_values(&[outcome]).inc();
    }

    pub fn set_pending_actions(&self, count: i64) {
        PENDING_ACTIONS.set(count);
    }

    pub fn set_workload_groups(&self, count: i64) {
        WORKLOAD_GROUPS.set(count);
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry() {
        let registry = MetricsRegistry::new();

        registry.observe_tick(true, 0.02);
        registry.observe_tick(false, 1.5);
        registry.inc_decision("eviction_issued");
        registry.inc_readiness_outcome("timed_out");
        registry.set_pending_actions(2);
        registry.set_workload_groups(7);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "podspread_decisions_total"));
    }
}
