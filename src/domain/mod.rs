//! Domain layer for the cockpit agent
//!
//! This module contains the core models, the error type, and the port
//! traits that adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
