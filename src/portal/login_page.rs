//! Landing page interpretation
//!
//! The portal redirects its landing page to `<base>/site/.../c/<connection code>`.
//! The connection code is session scoped and has to be posted back with the
//! login form, together with the CSRF token rendered into that page.

use super::error::PortalError;
use scraper::{Html, Selector};

pub const CSRF_FIELD: &str = "YII_CSRF_TOKEN";

const SITE_MARKER: &str = "/site";
const CODE_MARKER: &str = "/c/";

/// Where the login form has to be posted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTarget {
    pub base_url: String,
    pub login_code: String,
}

impl LoginTarget {
    /// Derive base URL and connection code from the URL reached after redirects
    pub fn from_redirect(final_url: &str) -> Result<Self, PortalError> {
        let base_url = match final_url.find(SITE_MARKER) {
            Some(idx) => &final_url[..idx],
            None => final_url,
        }
        .trim_end_matches('/')
        .to_string();

        let login_code = final_url
            .rfind(CODE_MARKER)
            .map(|idx| &final_url[idx + CODE_MARKER.len()..])
            .map(|rest| rest.split(['/', '?', '#']).next().unwrap_or_default())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                PortalError::Auth(format!("no connection code in redirect URL {}", final_url))
            })?
            .to_string();

        Ok(Self {
            base_url,
            login_code,
        })
    }

    pub fn login_url(&self) -> String {
        format!("{}/site/login/c/{}", self.base_url, self.login_code)
    }
}

/// Value of the hidden CSRF input, if the page carries one
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"input[name="{}"]"#, CSRF_FIELD)).ok()?;
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .find_map(|input| input.value().attr("value"))
        .map(|value| value.to_string())
}

/// True when a response landed on the portal's login form
pub fn is_login_page(final_url: &str) -> bool {
    final_url.contains("/site/login")
}
