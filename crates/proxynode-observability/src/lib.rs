//! ProxyNode Observability
//!
//! This crate provides observability features:
//! - Structured logging setup
//! - Audit events for classified failures

pub mod audit;
pub mod logging;

pub use audit::record_failure;
pub use logging::init_logging;
