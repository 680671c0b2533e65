//! Aggregation and scoring over normalized readings.
//!
//! [`aggregate`] summarizes one group of readings, [`bucket`] splits samples
//! into (location, UTC day) groups, [`latest`] keeps the newest sample per
//! location, and [`analyzer`] answers the dashboard queries on top of a store.

pub mod aggregate;
pub mod analyzer;
pub mod bucket;
pub mod latest;
pub mod types;
pub mod utility;
