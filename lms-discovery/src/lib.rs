//! LMS server discovery library
//!
//! This crate provides a simple API for discovering Logitech/Lyrion Media
//! Servers on a local network. Discovery is a single UDP broadcast of the
//! server's JSON-port probe, followed by a timeout-bounded receive loop.
//!
//! # Quick Start
//!
//! ```no_run
//! use lms_discovery::get;
//!
//! // Discover all LMS servers on the network
//! let servers = get();
//! for server in servers {
//!     println!("Found LMS at {}:{}", server.host, server.port);
//! }
//! ```
//!
//! # Iterator-based Discovery
//!
//! For more control, use the iterator API:
//!
//! ```no_run
//! use lms_discovery::{get_iter, ServerEvent};
//!
//! for event in get_iter() {
//!     match event {
//!         ServerEvent::Found(server) => {
//!             println!("Found: {}:{}", server.host, server.port);
//!             // Can break early if needed
//!         }
//!     }
//! }
//! ```

mod discovery;
mod error;
mod probe;

pub use discovery::DiscoveryIterator;
pub use error::{DiscoveryError, Result};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A discovered LMS server: the address it answered from and the HTTP port
/// its control interface listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// IP address the discovery reply came from
    pub host: String,
    /// HTTP port carried in the reply (typically 9000)
    pub port: u16,
}

/// Events emitted during server discovery.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// An LMS server answered the probe
    Found(Server),
}

/// Discover all LMS servers on the local network with a default 3-second timeout.
///
/// This is a convenience function that collects all discovered servers into a
/// Vec. For more control over the discovery process, use `get_iter()` instead.
pub fn get() -> Vec<Server> {
    get_with_timeout(Duration::from_secs(3))
}

/// Discover all LMS servers on the local network with a custom timeout.
///
/// Blocks the calling thread for up to `timeout` while replies are collected.
/// An empty Vec means no server answered in time, which is a valid outcome on
/// a network without an LMS.
pub fn get_with_timeout(timeout: Duration) -> Vec<Server> {
    get_iter_with_timeout(timeout)
        .map(|event| match event {
            ServerEvent::Found(server) => server,
        })
        .collect()
}

/// Get an iterator for discovering LMS servers with a default 3-second timeout.
pub fn get_iter() -> DiscoveryIterator {
    get_iter_with_timeout(Duration::from_secs(3))
}

/// Get an iterator for discovering LMS servers with a custom timeout.
///
/// Socket setup failures degrade to an empty iterator rather than a panic;
/// the caller sees the same "nothing found" outcome as an idle network.
pub fn get_iter_with_timeout(timeout: Duration) -> DiscoveryIterator {
    DiscoveryIterator::new(timeout).unwrap_or_else(|_| DiscoveryIterator::empty())
}
