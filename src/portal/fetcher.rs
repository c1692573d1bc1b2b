//! Order export queries against an authenticated session

use super::error::PortalError;
use super::login_page::is_login_page;
use super::orders::{parse_orders_page, OrderBatch, OrdersPage};
use super::session::SessionManager;
use super::transport::PortalResponse;
use chrono::{Duration, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

pub const EXPORT_PATH: &str = "ordemProducao/exportarOrdens";
pub const REPORT_SUFFIX: &str = "_orders.json";

/// Fixed filter set sent with every export request
#[derive(Debug, Clone)]
pub struct OrderQuery {
    pub days_back: i64,
    pub days_ahead: i64,
    pub page_size: u32,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            days_back: 30,
            days_ahead: 60,
            page_size: 20,
        }
    }
}

impl OrderQuery {
    /// Query parameters for `code`, with the delivery window centred on `today`
    pub fn params(&self, code: &str, today: NaiveDate) -> Vec<(String, String)> {
        let from = today - Duration::days(self.days_back);
        let to = today + Duration::days(self.days_ahead);

        [
            ("OrdemProducao[codigo]", code.to_string()),
            ("OrdemProducao[_nomeCliente]", String::new()),
            ("OrdemProducao[_nomeMaterial]", String::new()),
            ("OrdemProducao[status_op_id]", "Todos".to_string()),
            ("OrdemProducao[_etapasPlanejadas]", String::new()),
            ("OrdemProducao[forecast]", "0".to_string()),
            ("OrdemProducao[_inicioCriacao]", String::new()),
            ("OrdemProducao[_fimCriacao]", String::new()),
            ("OrdemProducao[_inicioEntrega]", from.format("%d/%m/%Y").to_string()),
            ("OrdemProducao[_fimEntrega]", to.format("%d/%m/%Y").to_string()),
            ("OrdemProducao[_limparFiltro]", "0".to_string()),
            ("pageSize", self.page_size.to_string()),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
    }
}

pub struct OrderFetcher {
    reports_dir: PathBuf,
    query: OrderQuery,
}

impl OrderFetcher {
    pub fn new(reports_dir: impl AsRef<Path>, query: OrderQuery) -> Self {
        Self {
            reports_dir: reports_dir.as_ref().to_path_buf(),
            query,
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub async fn fetch_orders_by_code(
        &self,
        session: &mut SessionManager,
        code: &str,
    ) -> Result<OrderBatch, PortalError> {
        let today = chrono::Local::now().date_naive();
        self.fetch_orders_on(session, code, today).await
    }

    /// Fetch as of `today`, which dates both the query window and the report
    pub async fn fetch_orders_on(
        &self,
        session: &mut SessionManager,
        code: &str,
        today: NaiveDate,
    ) -> Result<OrderBatch, PortalError> {
        log::info!("🔎 Fetching orders for code {}", code);
        let params = self.query.params(code, today);
        let response = self.request_export(session, &params).await?;

        match parse_orders_page(&response.body)? {
            OrdersPage::NoResults => {
                log::info!("No orders found for code {}", code);
                Ok(OrderBatch::new())
            }
            OrdersPage::NoTable => {
                log::warn!("⚠️  No table in export response for code {}", code);
                Ok(OrderBatch::new())
            }
            OrdersPage::NoRows => {
                log::warn!("⚠️  Export table for code {} has no rows", code);
                Ok(OrderBatch::new())
            }
            OrdersPage::Orders(batch) if batch.is_empty() => {
                log::warn!("⚠️  No usable rows in export table for code {}", code);
                Ok(batch)
            }
            OrdersPage::Orders(batch) => {
                log::info!("✅ Fetched {} orders for code {}", batch.len(), code);
                let path = self.write_report(&batch, today)?;
                log::info!("💾 Report saved: {}", path.display());
                Ok(batch)
            }
        }
    }

    /// GET the export page. A response that shows the session was rejected
    /// closes it and is retried once on a fresh login.
    async fn request_export(
        &self,
        session: &mut SessionManager,
        params: &[(String, String)],
    ) -> Result<PortalResponse, PortalError> {
        let mut retried = false;

        loop {
            let transport = session.get_client().await?;
            let base_url = session
                .base_url()
                .ok_or_else(|| PortalError::Auth("session has no base URL".to_string()))?
                .to_string();
            let url = format!("{}/{}", base_url, EXPORT_PATH);

            let response = transport.get(&url, params).await?;
            if !session_rejected(&response) {
                return response.error_for_status();
            }

            session.close();
            if retried {
                return Err(PortalError::Auth(
                    "portal rejected the session after re-authentication".to_string(),
                ));
            }
            log::warn!("⚠️  Portal rejected the session (HTTP {}), logging in again", response.status);
            retried = true;
        }
    }

    /// Write `<DD-MM-YYYY>_orders.json` into the reports directory
    pub fn write_report(&self, batch: &OrderBatch, date: NaiveDate) -> Result<PathBuf, PortalError> {
        fs::create_dir_all(&self.reports_dir)?;
        let path = self
            .reports_dir
            .join(format!("{}{}", date.format("%d-%m-%Y"), REPORT_SUFFIX));
        fs::write(&path, batch.to_json_pretty()?)?;
        Ok(path)
    }
}

fn session_rejected(response: &PortalResponse) -> bool {
    matches!(response.status, 401 | 403) || is_login_page(&response.final_url)
}
