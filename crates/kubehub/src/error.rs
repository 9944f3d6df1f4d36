use kube::core::ErrorResponse;
use thiserror::Error;

/// Cluster contact failures, classified by how the reflector recovers.
#[derive(Debug, Clone, Error)]
pub enum WatchError {
    /// 410: the resource version is too old; relist immediately.
    #[error("resource version expired: {0}")]
    Gone(String),
    /// 401/403: logged loudly, retried with backoff.
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("transient: {0}")]
    Transient(String),
}

impl WatchError {
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        match code {
            410 => WatchError::Gone(message.into()),
            401 | 403 => WatchError::Unauthorized(message.into()),
            _ => WatchError::Transient(message.into()),
        }
    }

    pub fn is_expired(&self) -> bool { matches!(self, WatchError::Gone(_)) }

    /// Short label value for telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            WatchError::Gone(_) => "expired",
            WatchError::Unauthorized(_) => "unauthorized",
            WatchError::Transient(_) => "error",
        }
    }
}

impl From<ErrorResponse> for WatchError {
    fn from(r: ErrorResponse) -> Self { WatchError::from_status(r.code, r.message) }
}

impl From<kube::Error> for WatchError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(r) => r.into(),
            other => WatchError::Transient(other.to_string()),
        }
    }
}
