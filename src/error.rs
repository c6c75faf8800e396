use thiserror::Error;

/// Errors raised while talking to the Graph API or the completion backend.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The remote side answered, but not with a 2xx.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} response could not be decoded: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to build keyword matcher: {0}")]
    Matcher(#[from] aho_corasick::BuildError),
}

impl BridgeError {
    pub(crate) fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| BridgeError::Transport { service, source }
    }

    /// True when the remote endpoint rejected the call with a non-2xx status.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BridgeError::Status { .. })
    }
}
