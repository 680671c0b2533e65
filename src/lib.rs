pub mod analyzers;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod ingest;
pub mod normalize;
pub mod output;
pub mod reading;
pub mod risk;
pub mod services;
pub mod stats;
pub mod store;
