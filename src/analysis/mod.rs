//! Analysis helpers for presenting alerts.
//!
//! The detector returns alerts in discovery order; everything here is for
//! the report layer.

pub mod aggregator;

pub use aggregator::*;
