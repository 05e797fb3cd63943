//! Core discovery logic and iterator implementation.
//!
//! This module implements the discovery algorithm that:
//! 1. Broadcasts the LMS discovery probe over UDP
//! 2. Collects replies until the socket's read timeout expires
//! 3. De-duplicates repeated replies from the same server
//! 4. Yields discovered servers as events

use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::Result;
use crate::probe::{ProbeReply, ProbeSocket};
use crate::{Server, ServerEvent};

/// Iterator that discovers LMS servers on the local network.
///
/// Performs one broadcast probe and yields `ServerEvent::Found` for each
/// server that answers before the timeout. Repeated replies from the same
/// host/port pair are reported once. Zero results is a valid outcome: the
/// iterator simply ends.
pub struct DiscoveryIterator {
    probe: Option<ProbeSocket>,
    timeout: Duration,
    replies: Vec<ProbeReply>,
    reply_index: usize,
    seen: HashSet<ProbeReply>,
}

impl DiscoveryIterator {
    /// Create a new discovery iterator with the specified timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let probe = ProbeSocket::new(timeout)?;

        Ok(Self {
            probe: Some(probe),
            timeout,
            replies: Vec::new(),
            reply_index: 0,
            seen: HashSet::new(),
        })
    }

    /// Create an empty iterator that yields no results.
    /// Used as a fallback when socket setup fails.
    pub(crate) fn empty() -> Self {
        Self {
            probe: None,
            timeout: Duration::ZERO,
            replies: Vec::new(),
            reply_index: 0,
            seen: HashSet::new(),
        }
    }

    /// Send the probe and drain replies into the buffer.
    ///
    /// Runs once, on the first `next()` call; blocks the caller for up to
    /// the configured timeout. The socket is released when this returns,
    /// whether or not the probe send succeeded.
    fn fill_buffer(&mut self) {
        if let Some(probe) = self.probe.take() {
            info!(timeout_secs = self.timeout.as_secs_f64(), "searching for LMS servers");
            match probe.probe() {
                Ok(iter) => {
                    for reply in iter {
                        match reply {
                            Ok(reply) => self.replies.push(reply),
                            Err(e) => {
                                // A hard socket error will not clear itself;
                                // stop collecting rather than spin.
                                warn!("error reading discovery reply: {}", e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("discovery probe failed: {}", e);
                }
            }
            if self.replies.is_empty() {
                warn!("server search timed out with no results");
            }
        }
    }
}

impl Iterator for DiscoveryIterator {
    type Item = ServerEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.probe.is_some() {
            self.fill_buffer();
        }

        loop {
            if self.reply_index >= self.replies.len() {
                return None;
            }

            let reply = self.replies[self.reply_index].clone();
            self.reply_index += 1;

            // Servers often answer a broadcast more than once.
            if !self.seen.insert(reply.clone()) {
                continue;
            }

            return Some(ServerEvent::Found(Server {
                host: reply.host,
                port: reply.port,
            }));
        }
    }
}

impl Drop for DiscoveryIterator {
    fn drop(&mut self) {
        // Release the UDP socket even if the iterator is dropped before the
        // first next() call.
        if let Some(probe) = self.probe.take() {
            drop(probe);
        }
    }
}
