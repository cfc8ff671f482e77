// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the order workflow
// ============================================================================
//
// Provides:
// - Order throughput (created, updated per branch, deleted)
// - Workflow failures by operation and error kind
// - Workflow latency per operation
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    pub orders_created: IntCounter,
    pub order_updates: IntCounterVec,
    pub orders_deleted: IntCounter,
    pub workflow_failures: IntCounterVec,
    pub workflow_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_updates = IntCounterVec::new(
            Opts::new("order_updates_total", "Total order updates by decision branch"),
            &["branch"],
        )?;
        registry.register(Box::new(order_updates.clone()))?;

        let orders_deleted = IntCounter::new("orders_deleted_total", "Total orders deleted")?;
        registry.register(Box::new(orders_deleted.clone()))?;

        let workflow_failures = IntCounterVec::new(
            Opts::new("order_workflow_failures_total", "Failed order operations"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(workflow_failures.clone()))?;

        let workflow_duration = HistogramVec::new(
            HistogramOpts::new("order_workflow_duration_seconds", "Order operation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(workflow_duration.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_updates,
            orders_deleted,
            workflow_failures,
            workflow_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_created(&self) {
        self.orders_created.inc();
    }

    pub fn record_update(&self, branch: &str) {
        self.order_updates.with_label_values(&[branch]).inc();
    }

    pub fn record_deleted(&self) {
        self.orders_deleted.inc();
    }

    pub fn record_failure(&self, operation: &str, kind: &str) {
        self.workflow_failures.with_label_values(&[operation, kind]).inc();
    }

    pub fn observe_duration(&self, operation: &str, duration_secs: f64) {
        self.workflow_duration
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
}
