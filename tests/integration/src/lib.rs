//! Integration test utilities for the event pipeline
//!
//! Event builders, gateway frame builders and stream helpers shared by the
//! bus and translator suites.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
