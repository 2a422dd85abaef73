use thiserror::Error;

/// Failures surfaced by the gateway client and the dashboard core.
///
/// Every variant is recoverable: views keep their last data and expose a
/// retry, commands turn the error into a failure report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("transport error: {0}")]
    Transport(String),

    /// The gateway answered 401 or rejected the session.
    #[error("authentication required: {0}")]
    Auth(String),

    /// Rejected locally before any request was sent.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The gateway answered but reported `success: false`.
    #[error("gateway rejected request: {0}")]
    Gateway(String),

    #[error("could not decode gateway response: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    pub fn is_auth(&self) -> bool {
        matches!(self, DashboardError::Auth(_))
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::Decode(err.to_string())
        } else {
            DashboardError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for DashboardError {
    fn from(err: config::ConfigError) -> Self {
        DashboardError::Config(err.to_string())
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
