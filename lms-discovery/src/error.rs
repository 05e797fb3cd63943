//! Error types for the discovery system.

use std::fmt;

/// Error type for discovery operations.
///
/// Discovery treats malformed datagrams as non-matches rather than errors,
/// so the only failure mode left is the socket itself.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Socket-level errors (binding, broadcast setup, sending the probe)
    NetworkError(String),
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::NetworkError(msg) => write!(f, "Network error: {}", msg),
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
