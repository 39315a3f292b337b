//! Metrics collection for participation-service.
//!
//! HTTP request metrics go through the `metrics` recorder; gating outcomes
//! are counted in a dedicated Prometheus registry.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static DECISIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static CAPTCHA_VERIFICATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GUARD_REDIRECTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize metrics collection. Call once, from `main`.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    let registry = Registry::new();

    let decisions = IntCounterVec::new(
        Opts::new(
            "participation_decisions_total",
            "Gating decisions by selected group and outcome",
        ),
        &["group", "outcome"],
    )
    .expect("Failed to create participation_decisions_total metric");

    let captcha = IntCounterVec::new(
        Opts::new(
            "participation_captcha_verifications_total",
            "CAPTCHA verifications by result",
        ),
        &["result"],
    )
    .expect("Failed to create participation_captcha_verifications_total metric");

    let redirects = IntCounterVec::new(
        Opts::new(
            "participation_route_guard_redirects_total",
            "Group page requests redirected back to the participation page",
        ),
        &["reason"],
    )
    .expect("Failed to create participation_route_guard_redirects_total metric");

    registry
        .register(Box::new(decisions.clone()))
        .expect("Failed to register participation_decisions_total");
    registry
        .register(Box::new(captcha.clone()))
        .expect("Failed to register participation_captcha_verifications_total");
    registry
        .register(Box::new(redirects.clone()))
        .expect("Failed to register participation_route_guard_redirects_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    DECISIONS_TOTAL
        .set(decisions)
        .expect("Failed to set participation_decisions_total");
    CAPTCHA_VERIFICATIONS_TOTAL
        .set(captcha)
        .expect("Failed to set participation_captcha_verifications_total");
    GUARD_REDIRECTS_TOTAL
        .set(redirects)
        .expect("Failed to set participation_route_guard_redirects_total");
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&registry.gather(), &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_decision(group: &str, outcome: &str) {
    if let Some(counter) = DECISIONS_TOTAL.get() {
        counter.with_label_values(&[group, outcome]).inc();
    }
}

pub fn record_captcha(result: &str) {
    if let Some(counter) = CAPTCHA_VERIFICATIONS_TOTAL.get() {
        counter.with_label_values(&[result]).inc();
    }
}

pub fn record_guard_redirect(reason: &str) {
    if let Some(counter) = GUARD_REDIRECTS_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}
