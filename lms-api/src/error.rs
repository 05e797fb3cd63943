use rpc_client::RpcError;
use thiserror::Error;

/// High-level errors for LMS client operations
///
/// Configuration problems are raised before any network I/O is attempted;
/// transport and decoding problems come up from the RPC layer and keep
/// their message intact.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required attribute is missing or holds a disallowed value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Response decoding error
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<RpcError> for ApiError {
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::Network(msg) => ApiError::Network(msg),
            RpcError::Parse(msg) => ApiError::Parse(msg),
        }
    }
}
