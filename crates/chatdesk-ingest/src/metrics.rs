// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; the binary installs the Prometheus recorder
//! when metrics are enabled, otherwise these calls are no-ops.

use metrics::{describe_counter, describe_gauge};

/// Registers descriptions for every chatdesk metric.
pub fn register_metrics() {
    describe_counter!(
        "chatdesk_events_ingested_total",
        "Transport events handled by the ingestion pipeline, by outcome"
    );
    describe_counter!(
        "chatdesk_autoreplies_total",
        "Automated responder runs, by resulting action"
    );
    describe_counter!(
        "chatdesk_errors_reported_total",
        "Errors reported to error tracking, by component"
    );
    describe_gauge!("chatdesk_sessions_ready", "Sessions currently ready");
}

pub fn record_ingest(outcome: &'static str) {
    metrics::counter!("chatdesk_events_ingested_total", "outcome" => outcome).increment(1);
}

pub fn record_autoreply(action: &str) {
    metrics::counter!("chatdesk_autoreplies_total", "action" => action.to_string()).increment(1);
}

pub fn record_error(component: &'static str) {
    metrics::counter!("chatdesk_errors_reported_total", "component" => component).increment(1);
}
