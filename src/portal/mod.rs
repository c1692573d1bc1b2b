//! Production-management portal client
//!
//! The portal has no API. Orders are scraped from its HTML export page after
//! a form login protected by a per-page CSRF token.
//!
//! # Architecture
//!
//! ```text
//! PortalHandle ──mpsc──▶ portal worker task (sole owner)
//!                           ├─ SessionManager ── PortalConnector → PortalTransport (cookies)
//!                           └─ OrderFetcher ──── export page → OrderBatch → reports/<date>_orders.json
//! ```

pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod login_page;
pub mod orders;
pub mod session;
pub mod transport;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use credentials::{CredentialProvider, Credentials, StaticCredentials};
pub use error::PortalError;
pub use fetcher::{OrderFetcher, OrderQuery};
pub use orders::{Order, OrderBatch};
pub use session::{SessionManager, SessionPhase, SessionState};
pub use transport::{PortalConnector, PortalResponse, PortalTransport, ReqwestConnector};
pub use worker::{spawn_portal_worker, PortalHandle, PortalTimeouts, ScrapeOutcome, ScrapePayload};
