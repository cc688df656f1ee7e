//! ProxyNode Core Types
//!
//! This crate provides the types shared by every ProxyNode component:
//! - Error classification and the core error type
//! - Task-scoped correlation context (session id)
//! - Levels of assurance
//! - Layered configuration

pub mod classification;
pub mod config;
pub mod correlation;
pub mod error;
pub mod loa;

pub use classification::{Classify, ErrorClassification};
pub use correlation::{CorrelationContext, CorrelationGuard};
pub use error::{Error, Result};
pub use loa::LevelOfAssurance;
