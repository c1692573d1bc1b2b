//! Raw socket ingestion
//!
//! ```text
//! producer ──bytes──▶ LineFramer ──message──▶ "<ts> | <message>" ──▶ EventStore
//!     ◀────────────── "OK" ───────────────────────────────────────────┘
//! ```

pub mod framing;
pub mod listener;

pub use framing::{FrameError, LineFramer, DEFAULT_MAX_LINE_BYTES};
pub use listener::{handle_connection, IngestError, IngestionListener, ACK};
