//! Production floor telemetry and order lookup
//!
//! Machines push `product;production;pause;total;quantity` messages over TCP.
//! Each one is timestamped into an append-only log, and per-product statistics
//! are derived from that log on request. Separately, production orders are
//! scraped from the manufacturing portal behind a single authenticated session.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod ingestion;
pub mod portal;
pub mod settings;
pub mod store;
