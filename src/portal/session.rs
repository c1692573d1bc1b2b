//! Authenticated portal session
//!
//! ```text
//! Unauthenticated ──login──▶ Authenticating ──ok──▶ Authenticated ──close──▶ Invalidated
//!        ▲                        │ failure                                     │
//!        └────────────────────────┘                  get_client (re-login) ◀────┘
//! ```
//!
//! Login always starts from the landing page: the portal hands out the
//! connection code through the redirect target and renders a fresh CSRF token
//! into the page, so there is no fixed login URL to post to directly.
//!
//! Nothing probes the session in the background. A caller that sees the
//! portal reject a request closes the session, and the next `get_client`
//! logs in again.

use super::credentials::CredentialProvider;
use super::error::PortalError;
use super::login_page::{extract_csrf_token, LoginTarget, CSRF_FIELD};
use super::transport::{PortalConnector, PortalTransport};
use std::sync::Arc;

/// Login attempts made by one `get_client` call before giving up
pub const LOGIN_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Invalidated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub csrf_token: Option<String>,
    pub base_url: Option<String>,
    pub login_code: Option<String>,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }
}

pub struct SessionManager {
    portal_url: String,
    connector: Arc<dyn PortalConnector>,
    credentials: Arc<dyn CredentialProvider>,
    transport: Option<Arc<dyn PortalTransport>>,
    state: SessionState,
}

impl SessionManager {
    pub fn new(
        portal_url: impl Into<String>,
        connector: Arc<dyn PortalConnector>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            portal_url: portal_url.into(),
            connector,
            credentials,
            transport: None,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some() && self.state.is_open()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.state.base_url.as_deref()
    }

    /// Log in on a brand new transport. Failures are logged and reported as
    /// `false`; the session is left closed.
    pub async fn login(&mut self) -> bool {
        match self.authenticate().await {
            Ok(()) => true,
            Err(e) => {
                log::error!("❌ Login failed: {}", e);
                false
            }
        }
    }

    /// Same as [`login`](Self::login) but with the failure cause.
    pub async fn authenticate(&mut self) -> Result<(), PortalError> {
        self.transport = None;
        self.state = SessionState {
            phase: SessionPhase::Authenticating,
            ..SessionState::default()
        };

        match self.run_login_flow().await {
            Ok((transport, target, csrf_token)) => {
                self.transport = Some(transport);
                self.state = SessionState {
                    phase: SessionPhase::Authenticated,
                    csrf_token: Some(csrf_token),
                    base_url: Some(target.base_url),
                    login_code: Some(target.login_code),
                };
                log::info!("✅ Login successful");
                Ok(())
            }
            Err(e) => {
                self.transport = None;
                self.state = SessionState::default();
                Err(e)
            }
        }
    }

    async fn run_login_flow(&self) -> Result<(Arc<dyn PortalTransport>, LoginTarget, String), PortalError> {
        let credentials = self.credentials.credentials()?;
        if credentials.username.is_empty() {
            log::warn!("⚠️  Portal username is empty");
        }

        log::info!("🔐 Opening portal session at {}", self.portal_url);
        let transport = self.connector.open()?;

        let landing = transport.get(&self.portal_url, &[]).await?.error_for_status()?;
        log::info!("↪️  Redirected to {}", landing.final_url);

        let target = LoginTarget::from_redirect(&landing.final_url)?;
        let csrf_token = extract_csrf_token(&landing.body)
            .ok_or_else(|| PortalError::Auth("CSRF token not found".to_string()))?;
        log::debug!("CSRF token extracted");

        let form = vec![
            (CSRF_FIELD.to_string(), csrf_token.clone()),
            ("LoginForm[username]".to_string(), credentials.username),
            ("LoginForm[password]".to_string(), credentials.password),
            ("LoginForm[codigoConexao]".to_string(), target.login_code.clone()),
            ("yt0".to_string(), "Entrar".to_string()),
        ];

        let login_url = target.login_url();
        log::info!("🔑 Sending login request to {}", login_url);
        let response = transport.post_form(&login_url, &form).await?;
        if !response.is_success() {
            return Err(PortalError::Auth(format!(
                "login rejected with HTTP {}",
                response.status
            )));
        }

        Ok((transport, target, csrf_token))
    }

    /// Current transport, logging in first when the session is not open.
    ///
    /// At most [`LOGIN_ATTEMPTS`] logins per call.
    pub async fn get_client(&mut self) -> Result<Arc<dyn PortalTransport>, PortalError> {
        if self.is_open() {
            if let Some(transport) = &self.transport {
                return Ok(transport.clone());
            }
        }

        log::warn!("⚠️  Session invalid or closed, re-authenticating...");
        for attempt in 1..=LOGIN_ATTEMPTS {
            if self.login().await {
                if let Some(transport) = &self.transport {
                    return Ok(transport.clone());
                }
            }
            log::warn!("⏳ Login attempt {} of {} failed", attempt, LOGIN_ATTEMPTS);
        }

        Err(PortalError::Auth("unable to authenticate".to_string()))
    }

    /// Drop the transport and its cookies. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            self.state.phase = SessionPhase::Invalidated;
            self.state.csrf_token = None;
            log::info!("🔒 Session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::credentials::StaticCredentials;
    use crate::portal::testing::{FakePortal, LANDING_WITHOUT_TOKEN, PORTAL_URL};

    fn manager(portal: &FakePortal) -> SessionManager {
        SessionManager::new(
            PORTAL_URL,
            Arc::new(portal.clone()),
            Arc::new(StaticCredentials::new("operator", "s3cret")),
        )
    }

    #[tokio::test]
    async fn test_login_populates_state() {
        let portal = FakePortal::accepting();
        let mut session = manager(&portal);

        assert!(session.login().await);
        assert!(session.is_open());

        let state = session.state();
        assert_eq!(state.phase, SessionPhase::Authenticated);
        assert_eq!(state.csrf_token.as_deref(), Some("csrf-abc"));
        assert_eq!(state.base_url.as_deref(), Some("https://portal.test"));
        assert_eq!(state.login_code.as_deref(), Some("CONN42"));
    }

    #[tokio::test]
    async fn test_login_posts_form_to_derived_endpoint() {
        let portal = FakePortal::accepting();
        let mut session = manager(&portal);
        assert!(session.login().await);

        let requests = portal.requests();
        let post = requests.iter().find(|r| r.method == "POST").unwrap();
        assert_eq!(post.url, "https://portal.test/site/login/c/CONN42");

        let field = |name: &str| {
            post.params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(field("YII_CSRF_TOKEN"), Some("csrf-abc"));
        assert_eq!(field("LoginForm[username]"), Some("operator"));
        assert_eq!(field("LoginForm[password]"), Some("s3cret"));
        assert_eq!(field("LoginForm[codigoConexao]"), Some("CONN42"));
        assert_eq!(field("yt0"), Some("Entrar"));
    }

    #[tokio::test]
    async fn test_missing_csrf_token_fails_closed() {
        let portal = FakePortal::new(LANDING_WITHOUT_TOKEN, 200);
        let mut session = manager(&portal);

        let result = session.authenticate().await;
        assert!(matches!(result, Err(PortalError::Auth(_))));
        assert!(!session.is_open());
        assert!(!session.state().is_open());
        assert_eq!(session.state().phase, SessionPhase::Unauthenticated);
        assert_eq!(portal.logins(), 0);

        assert!(!session.login().await);
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_rejected_login_status() {
        let portal = FakePortal::new(crate::portal::testing::LANDING_WITH_TOKEN, 500);
        let mut session = manager(&portal);

        assert!(!session.login().await);
        assert!(!session.is_open());
        assert_eq!(session.state(), &SessionState::default());
    }

    #[tokio::test]
    async fn test_get_client_reuses_open_session() {
        let portal = FakePortal::accepting();
        let mut session = manager(&portal);

        session.get_client().await.unwrap();
        session.get_client().await.unwrap();

        assert_eq!(portal.opens(), 1);
        assert_eq!(portal.logins(), 1);
    }

    #[tokio::test]
    async fn test_get_client_relogs_exactly_once_after_close() {
        let portal = FakePortal::accepting();
        let mut session = manager(&portal);
        assert!(session.login().await);

        session.close();
        assert_eq!(session.state().phase, SessionPhase::Invalidated);
        assert!(!session.is_open());

        session.get_client().await.unwrap();
        assert!(session.is_open());
        assert_eq!(portal.logins(), 2);
    }

    #[tokio::test]
    async fn test_get_client_gives_up_after_two_failures() {
        let portal = FakePortal::accepting();
        portal.set_login_status(403);
        let mut session = manager(&portal);

        match session.get_client().await {
            Err(PortalError::Auth(msg)) => assert_eq!(msg, "unable to authenticate"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("login should have failed"),
        }
        assert_eq!(portal.opens(), LOGIN_ATTEMPTS as usize);
        assert_eq!(portal.logins(), LOGIN_ATTEMPTS as usize);
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let portal = FakePortal::accepting();
        let mut session = manager(&portal);

        session.close();
        assert_eq!(session.state().phase, SessionPhase::Unauthenticated);

        assert!(session.login().await);
        session.close();
        session.close();
        assert_eq!(session.state().phase, SessionPhase::Invalidated);
        assert!(!session.is_open());
    }
}
