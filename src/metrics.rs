//! Prometheus-compatible metrics for the question-answering service.

use prometheus::{self, Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::sync::Arc;
use std::time::Instant;

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Default histogram buckets for latency tracking (in seconds).
/// Pipeline latency is dominated by the model call, so buckets reach 60s.
fn default_latency_buckets() -> Vec<f64> {
    vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
}

/// All metrics for the service.
pub struct Metrics {
    /// Prometheus registry for all metrics.
    pub registry: Registry,

    /// Total number of questions processed.
    pub questions_total: IntCounter,
    /// Total number of queries rejected by the safety validator.
    pub rejections_total: IntCounter,
    /// Total number of backend execution errors.
    pub backend_errors_total: IntCounter,
    /// Total number of language model errors.
    pub llm_errors_total: IntCounter,

    /// Server uptime in seconds.
    pub uptime_seconds: IntGauge,

    /// End-to-end pipeline duration in seconds.
    pub pipeline_duration_seconds: Histogram,
    /// Backend query execution duration in seconds.
    pub execution_duration_seconds: Histogram,

    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        let questions_total = IntCounter::new(
            "consulta_questions_total",
            "Total number of questions processed",
        )
        .expect("failed to create counter");

        let rejections_total = IntCounter::new(
            "consulta_rejections_total",
            "Total number of queries rejected by the safety validator",
        )
        .expect("failed to create counter");

        let backend_errors_total = IntCounter::new(
            "consulta_backend_errors_total",
            "Total number of backend execution errors",
        )
        .expect("failed to create counter");

        let llm_errors_total = IntCounter::new(
            "consulta_llm_errors_total",
            "Total number of language model errors",
        )
        .expect("failed to create counter");

        let uptime_seconds = IntGauge::new("consulta_uptime_seconds", "Server uptime in seconds")
            .expect("failed to create gauge");

        let pipeline_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consulta_pipeline_duration_seconds",
                "End-to-end pipeline duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        let execution_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consulta_execution_duration_seconds",
                "Backend query execution duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        registry
            .register(Box::new(questions_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(rejections_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(backend_errors_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(llm_errors_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(uptime_seconds.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(pipeline_duration_seconds.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(execution_duration_seconds.clone()))
            .expect("failed to register metric");

        Self {
            registry,
            questions_total,
            rejections_total,
            backend_errors_total,
            llm_errors_total,
            uptime_seconds,
            pipeline_duration_seconds,
            execution_duration_seconds,
            start_time: Instant::now(),
        }
    }

    /// Update the uptime gauge.
    pub fn update_uptime(&self) {
        self.uptime_seconds.set(self.start_time.elapsed().as_secs() as i64);
    }

    /// Export metrics in Prometheus text format.
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;
        self.update_uptime();

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}
