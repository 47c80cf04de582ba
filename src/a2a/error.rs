//! Error taxonomy for discovery and JSON-RPC calls.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, A2aError>;

#[derive(Debug, Error)]
pub enum A2aError {
    /// The discovery endpoint answered with a non-success status.
    #[error("Failed to fetch Agent Card from {url}. Status: {status}")]
    Discovery { url: String, status: u16, body: String },

    /// The discovery document is not a usable agent card.
    #[error("Fetched Agent Card is invalid, incomplete, or not an AgentCard: {reason}")]
    InvalidCard { reason: String },

    /// Connection refused, DNS failure, timeout, or a truncated body.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The RPC endpoint was reachable but answered with a non-success status.
    #[error("A2A message/send request failed. Status: {status}")]
    RpcHttp { status: u16, body: String },

    /// The RPC body was malformed or carried a JSON-RPC error.
    #[error("A2A message/send failed: {message}{}", code.map(|c| format!(" (Code: {c})")).unwrap_or_default())]
    RpcProtocol { code: Option<i64>, message: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl A2aError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        A2aError::RpcProtocol {
            code: None,
            message: message.into(),
        }
    }

    /// Stable short name of the failure class.
    pub fn code(&self) -> &'static str {
        match self {
            A2aError::Discovery { .. } => "discovery",
            A2aError::InvalidCard { .. } => "invalid-schema",
            A2aError::Transport { .. } => "transport",
            A2aError::RpcHttp { .. } => "rpc-http",
            A2aError::RpcProtocol { .. } => "rpc-protocol",
            A2aError::InvalidUrl { .. } => "invalid-url",
        }
    }

    /// Only transport failures are worth retrying; this layer never retries
    /// on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, A2aError::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = A2aError::RpcProtocol {
            code: Some(-32000),
            message: "Server error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "A2A message/send failed: Server error (Code: -32000)"
        );

        let err = A2aError::protocol("malformed response");
        assert_eq!(err.to_string(), "A2A message/send failed: malformed response");
        assert_eq!(err.code(), "rpc-protocol");
    }

    #[test]
    fn test_http_error_display() {
        let err = A2aError::RpcHttp {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(err.to_string(), "A2A message/send request failed. Status: 500");
        assert!(!err.is_retryable());
    }
}
