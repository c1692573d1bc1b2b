//! Single owner of the portal session
//!
//! The session manager and order fetcher live inside one task that handles
//! commands strictly one after another, so the session state is never touched
//! concurrently. Everything else talks to it through a cloneable
//! [`PortalHandle`] and waits for the reply with a timeout.
//!
//! A timed out call is not cancelled. The worker still finishes it and may
//! update the session afterwards (for example complete a login nobody is
//! waiting for any more).

use super::error::PortalError;
use super::fetcher::OrderFetcher;
use super::orders::OrderBatch;
use super::session::SessionManager;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub enum PortalCommand {
    Login {
        reply: oneshot::Sender<bool>,
    },
    FetchOrders {
        code: String,
        reply: oneshot::Sender<Result<OrderBatch, PortalError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone)]
pub struct PortalTimeouts {
    pub login: Duration,
    pub fetch: Duration,
    pub close: Duration,
}

impl Default for PortalTimeouts {
    fn default() -> Self {
        Self {
            login: Duration::from_secs(30),
            fetch: Duration::from_secs(90),
            close: Duration::from_secs(5),
        }
    }
}

/// Result of a scrape request as handed to the dashboard:
/// `{"ok": true, "data": {...}}` or `{"ok": false, "error": "..."}`
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    pub ok: bool,
    #[serde(flatten)]
    pub payload: ScrapePayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapePayload {
    Data(OrderBatch),
    Error(String),
}

impl From<Result<OrderBatch, PortalError>> for ScrapeOutcome {
    fn from(result: Result<OrderBatch, PortalError>) -> Self {
        match result {
            Ok(batch) => ScrapeOutcome {
                ok: true,
                payload: ScrapePayload::Data(batch),
            },
            Err(e) => ScrapeOutcome {
                ok: false,
                payload: ScrapePayload::Error(e.to_string()),
            },
        }
    }
}

#[derive(Clone)]
pub struct PortalHandle {
    tx: mpsc::Sender<PortalCommand>,
    timeouts: PortalTimeouts,
}

impl PortalHandle {
    pub async fn login(&self) -> Result<bool, PortalError> {
        let (reply, rx) = oneshot::channel();
        self.call(PortalCommand::Login { reply }, rx, self.timeouts.login).await
    }

    pub async fn fetch_orders(&self, code: &str) -> Result<OrderBatch, PortalError> {
        let (reply, rx) = oneshot::channel();
        let command = PortalCommand::FetchOrders {
            code: code.to_string(),
            reply,
        };
        self.call(command, rx, self.timeouts.fetch).await?
    }

    pub async fn scrape(&self, code: &str) -> ScrapeOutcome {
        let result = self.fetch_orders(code).await;
        if let Err(e) = &result {
            log::error!("❌ Scrape for {} failed: {}", code, e);
        }
        result.into()
    }

    pub async fn close(&self) -> Result<(), PortalError> {
        let (reply, rx) = oneshot::channel();
        self.call(PortalCommand::Close { reply }, rx, self.timeouts.close).await
    }

    async fn call<T>(
        &self,
        command: PortalCommand,
        rx: oneshot::Receiver<T>,
        limit: Duration,
    ) -> Result<T, PortalError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| PortalError::WorkerStopped)?;

        match tokio::time::timeout(limit, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(PortalError::WorkerStopped),
            Err(_) => Err(PortalError::Timeout(limit)),
        }
    }
}

/// Spawn the worker task. It stops, closing the session, once every handle
/// has been dropped.
pub fn spawn_portal_worker(
    session: SessionManager,
    fetcher: OrderFetcher,
    buffer: usize,
    timeouts: PortalTimeouts,
) -> (PortalHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(buffer);
    let task = tokio::spawn(run_portal_worker(rx, session, fetcher));
    (PortalHandle { tx, timeouts }, task)
}

pub async fn run_portal_worker(
    mut rx: mpsc::Receiver<PortalCommand>,
    mut session: SessionManager,
    fetcher: OrderFetcher,
) {
    log::info!("Portal worker started");

    while let Some(command) = rx.recv().await {
        match command {
            PortalCommand::Login { reply } => {
                let ok = session.login().await;
                let _ = reply.send(ok);
            }
            PortalCommand::FetchOrders { code, reply } => {
                let result = fetcher.fetch_orders_by_code(&mut session, &code).await;
                if reply.send(result).is_err() {
                    log::warn!("⚠️  Fetch for {} finished after the caller gave up", code);
                }
            }
            PortalCommand::Close { reply } => {
                session.close();
                let _ = reply.send(());
            }
        }
    }

    session.close();
    log::info!("Portal worker stopped");
}
