//! Infrastructure layer module
//!
//! Configuration loading and logging setup.

pub mod config;
pub mod logging;
