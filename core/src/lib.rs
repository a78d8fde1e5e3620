//! Marketing funnel analytics: normalize two campaign exports into one
//! schema, compute funnel metrics, and load everything into SQLite.

pub mod config;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod table;
pub mod types;
