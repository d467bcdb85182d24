//! evmtrack - earned value analytics for construction projects.
//!
//! The engine spreads each task's labor budget linearly over the Monday
//! weeks of its planned window, buckets approved progress into the same
//! weeks, and derives cumulative PV/EV/AC curves with CPI and SPI. Curves
//! roll up from tasks to stages and projects by summing values, and a
//! detector raises cost, schedule and overdue alerts.
//!
//! Storage sits behind the traits in [`store`]; [`store::MemoryStore`] is
//! the bundled implementation, filled from a JSON [`dataset::Dataset`].

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evm;
pub mod models;
pub mod report;
pub mod store;
