//! Aggregation over the event log
//!
//! ```text
//! EventStore::read_all → parse_line (tolerant) → group by product
//!     ↓
//! sort newest first → average over all records, keep last 50
//! ```

pub mod normalizer;
pub mod product;

pub use normalizer::{format_log_line, parse_line, TelemetryRecord, TIMESTAMP_FORMAT};
pub use product::{aggregate_lines, Aggregator, ProductAggregate, RECENT_RECORDS_LIMIT};
