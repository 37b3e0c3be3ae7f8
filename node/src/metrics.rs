//! # Prometheus Metrics
//!
//! Operational metrics for the verifier service, scraped by Prometheus at
//! `/metrics` on the metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use vaultline_protocol::policy::FailureClass;

/// Holds all Prometheus metric handles for the service.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Vault inputs that passed their predicate.
    pub spends_accepted_total: IntCounter,
    /// Rejected proposals, labelled by failure class.
    pub spends_rejected_total: IntCounterVec,
    /// Proposals produced by the builder.
    pub transactions_built_total: IntCounter,
    /// Proposals accepted by the ledger.
    pub transactions_submitted_total: IntCounter,
    /// Rebuilds after a lost UTXO race.
    pub submit_retries_total: IntCounter,
    /// Vaults currently in the registry.
    pub registered_vaults: IntGauge,
    /// Fee-loop passes per built transaction.
    pub build_iterations: Histogram,
    /// Wall time of whole-proposal verification in seconds.
    pub evaluation_latency_seconds: Histogram,
}

fn register<M>(registry: &Registry, metric: M) -> Result<M, prometheus::Error>
where
    M: prometheus::core::Collector + Clone + 'static,
{
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("vaultline".into()), None)?;

        let spends_accepted_total = register(
            &registry,
            IntCounter::new(
                "spends_accepted_total",
                "Vault inputs whose predicate accepted",
            )?,
        )?;
        let spends_rejected_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("spends_rejected_total", "Rejected proposals by failure class"),
                &["class"],
            )?,
        )?;
        let transactions_built_total = register(
            &registry,
            IntCounter::new("transactions_built_total", "Proposals produced by the builder")?,
        )?;
        let transactions_submitted_total = register(
            &registry,
            IntCounter::new(
                "transactions_submitted_total",
                "Proposals accepted by the ledger",
            )?,
        )?;
        let submit_retries_total = register(
            &registry,
            IntCounter::new(
                "submit_retries_total",
                "Rebuilds after an input was spent by another transaction",
            )?,
        )?;
        let registered_vaults = register(
            &registry,
            IntGauge::new("registered_vaults", "Vaults in the registry")?,
        )?;
        let build_iterations = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new("build_iterations", "Fee-loop passes per built transaction")
                    .buckets(vec![1.0, 2.0, 3.0, 4.0, 8.0]),
            )?,
        )?;
        let evaluation_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "evaluation_latency_seconds",
                    "Whole-proposal verification latency in seconds",
                )
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
            )?,
        )?;

        Ok(Self {
            registry,
            spends_accepted_total,
            spends_rejected_total,
            transactions_built_total,
            transactions_submitted_total,
            submit_retries_total,
            registered_vaults,
            build_iterations,
            evaluation_latency_seconds,
        })
    }

    /// Count a rejection under its failure class.
    pub fn record_rejection(&self, class: FailureClass) {
        let label = class.to_string();
        self.spends_rejected_total
            .with_label_values(&[label.as_str()])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_labelled_by_class() {
        let m = NodeMetrics::new().unwrap();
        m.record_rejection(FailureClass::PolicyViolation);
        m.record_rejection(FailureClass::PolicyViolation);
        m.spends_accepted_total.inc();
        let text = m.encode().unwrap();
        assert!(text.contains("vaultline_spends_rejected_total{class=\"policy_violation\"} 2"));
        assert!(text.contains("vaultline_spends_accepted_total 1"));
    }
}
