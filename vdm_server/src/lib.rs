//! HTTP server for the vdm authentication and role management core.
//!
//! - [`api`]: Router, handlers and guards
//! - [`config`]: Environment-driven configuration
//! - [`logging`]: `tracing` subscriber and security event logging
//! - [`metrics`]: Prometheus counters

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
