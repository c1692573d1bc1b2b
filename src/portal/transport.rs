//! HTTP transport seam for the portal
//!
//! A transport is one cookie-carrying HTTP session. Dropping it drops the
//! cookie jar, which is how a portal session is closed. The connector opens a
//! fresh transport for every login attempt.

use super::error::PortalError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) prodflow";

/// Response body with the URL reached after redirects
#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

impl PortalResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_for_status(self) -> Result<Self, PortalError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(PortalError::Transport(format!(
                "HTTP {} from {}",
                self.status, self.final_url
            )))
        }
    }
}

#[async_trait]
pub trait PortalTransport: Send + Sync {
    /// GET with query parameters, following redirects
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<PortalResponse, PortalError>;

    /// POST an urlencoded form, following redirects
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<PortalResponse, PortalError>;
}

pub trait PortalConnector: Send + Sync {
    /// Open a brand new session with an empty cookie jar
    fn open(&self) -> Result<Arc<dyn PortalTransport>, PortalError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    async fn into_portal_response(response: reqwest::Response) -> Result<PortalResponse, PortalError> {
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok(PortalResponse {
            status,
            final_url,
            body,
        })
    }
}

#[async_trait]
impl PortalTransport for ReqwestTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<PortalResponse, PortalError> {
        let response = self.client.get(url).query(query).send().await?;
        Self::into_portal_response(response).await
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<PortalResponse, PortalError> {
        let response = self.client.post(url).form(form).send().await?;
        Self::into_portal_response(response).await
    }
}

/// Opens `reqwest` clients with their own cookie store
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    user_agent: String,
    request_timeout: Duration,
}

impl ReqwestConnector {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl PortalConnector for ReqwestConnector {
    fn open(&self) -> Result<Arc<dyn PortalTransport>, PortalError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(self.user_agent.clone())
            .timeout(self.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Arc::new(ReqwestTransport { client }))
    }
}
