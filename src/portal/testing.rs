//! Scripted in-memory portal for unit tests

use super::error::PortalError;
use super::transport::{PortalConnector, PortalResponse, PortalTransport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const PORTAL_URL: &str = "https://portal.test/";
pub const REDIRECT_URL: &str = "https://portal.test/site/index/c/CONN42";

pub const LANDING_WITH_TOKEN: &str = r#"<html><body><form>
    <input type="hidden" name="YII_CSRF_TOKEN" value="csrf-abc" />
    </form></body></html>"#;

pub const LANDING_WITHOUT_TOKEN: &str = "<html><body><form><input name=\"q\"></form></body></html>";

#[derive(Debug, Clone)]
pub struct Request {
    pub method: &'static str,
    pub url: String,
    pub params: Vec<(String, String)>,
}

struct Script {
    landing_body: String,
    login_status: u16,
    export_responses: VecDeque<PortalResponse>,
    opens: usize,
    requests: Vec<Request>,
}

#[derive(Clone)]
pub struct FakePortal {
    script: Arc<Mutex<Script>>,
}

impl FakePortal {
    pub fn new(landing_body: &str, login_status: u16) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                landing_body: landing_body.to_string(),
                login_status,
                export_responses: VecDeque::new(),
                opens: 0,
                requests: Vec::new(),
            })),
        }
    }

    pub fn accepting() -> Self {
        Self::new(LANDING_WITH_TOKEN, 200)
    }

    pub fn push_export(&self, status: u16, final_url: &str, body: &str) {
        self.script.lock().unwrap().export_responses.push_back(PortalResponse {
            status,
            final_url: final_url.to_string(),
            body: body.to_string(),
        });
    }

    pub fn set_login_status(&self, status: u16) {
        self.script.lock().unwrap().login_status = status;
    }

    pub fn set_landing_body(&self, body: &str) {
        self.script.lock().unwrap().landing_body = body.to_string();
    }

    /// Number of sessions opened, one per login attempt
    pub fn opens(&self) -> usize {
        self.script.lock().unwrap().opens
    }

    pub fn requests(&self) -> Vec<Request> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn logins(&self) -> usize {
        self.requests().iter().filter(|r| r.method == "POST").count()
    }
}

impl PortalConnector for FakePortal {
    fn open(&self) -> Result<Arc<dyn PortalTransport>, PortalError> {
        self.script.lock().unwrap().opens += 1;
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl PortalTransport for FakePortal {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<PortalResponse, PortalError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(Request {
            method: "GET",
            url: url.to_string(),
            params: query.to_vec(),
        });

        if url == PORTAL_URL {
            return Ok(PortalResponse {
                status: 200,
                final_url: REDIRECT_URL.to_string(),
                body: script.landing_body.clone(),
            });
        }

        script
            .export_responses
            .pop_front()
            .ok_or_else(|| PortalError::Transport(format!("no scripted response for {}", url)))
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<PortalResponse, PortalError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(Request {
            method: "POST",
            url: url.to_string(),
            params: form.to_vec(),
        });

        Ok(PortalResponse {
            status: script.login_status,
            final_url: url.to_string(),
            body: String::new(),
        })
    }
}
