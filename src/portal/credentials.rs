use super::error::PortalError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Source of portal credentials, consulted before every login so edits to the
/// settings file take effect without a restart.
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Result<Credentials, PortalError>;
}

/// Fixed credentials
pub struct StaticCredentials(pub Credentials);

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(Credentials {
            username: username.into(),
            password: password.into(),
        })
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Result<Credentials, PortalError> {
        Ok(self.0.clone())
    }
}
