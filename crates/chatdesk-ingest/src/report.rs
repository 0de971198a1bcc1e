// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default error reporter.

use chatdesk_core::{ChatdeskError, ErrorReporter};
use tracing::error;

/// Logs reported errors and counts them per component.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, component: &'static str, err: &ChatdeskError) {
        error!(component, error = %err, retryable = err.is_retryable(), "error reported");
        crate::metrics::record_error(component);
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[traced_test]
    #[test]
    fn report_logs_component_and_error() {
        TracingReporter.report("ingest", &ChatdeskError::Internal("boom".into()));
        assert!(logs_contain("error reported"));
        assert!(logs_contain("boom"));
    }
}
