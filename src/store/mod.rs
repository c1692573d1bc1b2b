//! Durable event log
//!
//! Every accepted ingestion message becomes one line in a plain text file.
//! The file is the only persistence the system has; aggregates are derived
//! from it on demand.

pub mod error;
pub mod event_store;

pub use error::StoreError;
pub use event_store::{EventStore, LOG_FILE_NAME};
