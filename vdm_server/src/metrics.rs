//! Prometheus metrics for authentication and role management.
//!
//! Counters are recorded through the `metrics` facade; without an installed
//! exporter they are no-ops, so handlers record unconditionally.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use vdm_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::sign_in_attempts_total(metrics::Outcome::Success);
//! ```

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use vdm::ErrorKind;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Result label attached to every auth counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Rejected,
    Error,
}

impl Outcome {
    /// Outcome of an operation that failed with `kind`
    pub fn from_error(kind: ErrorKind) -> Self {
        if kind.is_internal() {
            Outcome::Error
        } else {
            Outcome::Rejected
        }
    }

    /// Outcome of any operation result whose error exposes a kind
    pub fn of<T, E>(result: &Result<T, E>, kind: impl Fn(&E) -> ErrorKind) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => Self::from_error(kind(e)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Rejected => "rejected",
            Outcome::Error => "error",
        }
    }
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment sign-in attempts counter.
pub fn sign_in_attempts_total(outcome: Outcome) {
    metrics::counter!("sign_in_attempts_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Increment refresh rotations counter.
pub fn refresh_rotations_total(outcome: Outcome) {
    metrics::counter!("refresh_rotations_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Increment password-reset counter for `stage` (`inquire` or `update`).
pub fn password_reset_requests_total(stage: &'static str, outcome: Outcome) {
    metrics::counter!("password_reset_requests_total",
        "stage" => stage,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

// ============================================================================
// Role Metrics
// ============================================================================

/// Increment role mutation counter for `operation` (`grant` or `revoke`).
pub fn role_mutations_total(operation: &'static str, outcome: Outcome) {
    metrics::counter!("role_mutations_total",
        "operation" => operation,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}
