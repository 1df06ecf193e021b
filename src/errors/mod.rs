/// Error taxonomy for the gateway
///
/// Propagation policy:
/// - Cache errors never escape the cache manager (fail-open, logged only)
/// - Upstream status errors propagate with the status preserved so callers
///   can decide retry policy
/// - Transport failures are logged in full server-side and surfaced to
///   external callers as a generic server error
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("missing required 'endpoint' parameter")]
    MissingEndpoint,

    #[error("upstream responded with status {status}")] RequestFailed {
        status: u16,
    },

    #[error("transport failure: {0}")] Transport(String),

    #[error("cache error: {0}")] Cache(String),

    #[error("decode error: {0}")] Decode(String),

    #[error("configuration error: {0}")] Config(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// HTTP status this error maps to at the network edge
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::MissingEndpoint => 400,
            GatewayError::RequestFailed { status } => *status,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}
