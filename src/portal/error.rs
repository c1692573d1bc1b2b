use std::time::Duration;

#[derive(Debug)]
pub enum PortalError {
    /// CSRF token missing, login rejected, or no session obtainable
    Auth(String),
    /// Connection or HTTP level failure of a single request
    Transport(String),
    /// Portal markup that could not be interpreted
    Parse(String),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    /// Caller gave up waiting on the portal worker
    Timeout(Duration),
    WorkerStopped,
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        PortalError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::Io(err)
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Serialization(err)
    }
}

impl std::fmt::Display for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortalError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            PortalError::Transport(msg) => write!(f, "Transport error: {}", msg),
            PortalError::Parse(msg) => write!(f, "Parse error: {}", msg),
            PortalError::Io(e) => write!(f, "IO error: {}", e),
            PortalError::Serialization(e) => write!(f, "Serialization error: {}", e),
            PortalError::Timeout(after) => write!(f, "Portal call timed out after {}s", after.as_secs()),
            PortalError::WorkerStopped => write!(f, "Portal worker is not running"),
        }
    }
}

impl std::error::Error for PortalError {}
