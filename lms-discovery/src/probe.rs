//! UDP probe for LMS server discovery
//!
//! This module owns the broadcast socket and the reply-parsing logic for the
//! LMS discovery exchange. It is not part of the public API.
//!
//! The exchange is a single broadcast of the `eJSON\0` probe on UDP port
//! 3483. Servers answer from their own address with a datagram of the form
//! `EJSON<len><digits>…`, where the byte after the literal `N` gives the
//! number of ASCII digits that encode the server's HTTP port.

use std::net::UdpSocket;
use std::time::Duration;

use crate::error::{DiscoveryError, Result};

/// Well-known UDP port LMS servers listen on for discovery probes.
pub(crate) const DISCOVERY_PORT: u16 = 3483;

/// Fixed probe payload requesting a JSON-port reply.
pub(crate) const PROBE_PAYLOAD: &[u8] = b"eJSON\0";

/// Valid replies start with this prefix.
const REPLY_PREFIX: &[u8] = b"EJSON";

/// One parsed discovery reply: the sender's address and its HTTP port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ProbeReply {
    pub host: String,
    pub port: u16,
}

/// Broadcast socket for LMS discovery probes.
pub(crate) struct ProbeSocket {
    socket: UdpSocket,
}

impl ProbeSocket {
    /// Bind an ephemeral broadcast-capable socket with the given read timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to bind UDP socket: {}", e)))?;

        socket
            .set_broadcast(true)
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to enable broadcast: {}", e)))?;

        socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to set read timeout: {}", e)))?;

        Ok(Self { socket })
    }

    /// Send the probe and return an iterator over the replies.
    ///
    /// The iterator ends when the socket's read timeout expires; there is no
    /// fixed reply count.
    pub fn probe(&self) -> Result<ProbeReplyIterator<'_>> {
        self.socket
            .send_to(PROBE_PAYLOAD, ("255.255.255.255", DISCOVERY_PORT))
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to send probe: {}", e)))?;

        Ok(ProbeReplyIterator::new(&self.socket))
    }
}

/// Iterator over discovery replies received on a probe socket.
pub(crate) struct ProbeReplyIterator<'a> {
    socket: &'a UdpSocket,
    buffer: [u8; 1024],
    finished: bool,
}

impl<'a> ProbeReplyIterator<'a> {
    fn new(socket: &'a UdpSocket) -> Self {
        Self {
            socket,
            buffer: [0; 1024],
            finished: false,
        }
    }
}

impl<'a> Iterator for ProbeReplyIterator<'a> {
    type Item = Result<ProbeReply>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((size, source)) => {
                    // Datagrams that don't parse are not ours to report;
                    // keep draining until the timeout ends the loop.
                    match parse_reply_port(&self.buffer[..size]) {
                        Some(port) => {
                            return Some(Ok(ProbeReply {
                                host: source.ip().to_string(),
                                port,
                            }));
                        }
                        None => continue,
                    }
                }
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut
                    {
                        self.finished = true;
                        return None;
                    }
                    return Some(Err(DiscoveryError::NetworkError(format!(
                        "Socket error: {}",
                        e
                    ))));
                }
            }
        }
    }
}

/// Parse the HTTP port out of a discovery reply datagram.
///
/// Returns `None` for anything that is not a well-formed reply: wrong
/// prefix, truncated length/digit fields, non-numeric digits, or a port
/// that does not fit in `u16`.
fn parse_reply_port(data: &[u8]) -> Option<u16> {
    if !data.starts_with(REPLY_PREFIX) {
        return None;
    }

    let marker = data.iter().position(|&b| b == b'N')?;
    let len = *data.get(marker + 1)? as usize;
    let digits = data.get(marker + 2..marker + 2 + len)?;

    std::str::from_utf8(digits).ok()?.parse::<u16>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"EJSON\x049000".as_slice(), Some(9000))]
    #[case(b"EJSON\x0480".as_slice(), None)] // length says 4, only 2 digits follow
    #[case(b"EJSON\x0280".as_slice(), Some(80))]
    #[case(b"EJSON\x053483x".as_slice(), None)] // non-digit inside the port field
    #[case(b"EJSON\x0565535".as_slice(), Some(65535))]
    #[case(b"EJSON\x0599999".as_slice(), None)] // does not fit in u16
    fn parse_reply_port_cases(#[case] data: &[u8], #[case] expected: Option<u16>) {
        assert_eq!(parse_reply_port(data), expected);
    }

    #[test]
    fn parse_reply_port_ignores_trailing_bytes() {
        // Real servers append further typed fields after the port; they are
        // irrelevant here and must not confuse the parser.
        assert_eq!(parse_reply_port(b"EJSON\x049000\x00eNAME\x04test"), Some(9000));
    }

    #[test]
    fn parse_reply_port_rejects_wrong_prefix() {
        assert_eq!(parse_reply_port(b"eJSON\x049000"), None);
        assert_eq!(parse_reply_port(b"HTTP/1.1 200 OK"), None);
    }

    #[test]
    fn parse_reply_port_rejects_truncated_reply() {
        assert_eq!(parse_reply_port(b"EJSON"), None);
        assert_eq!(parse_reply_port(b"EJSON\x04"), None);
        assert_eq!(parse_reply_port(b""), None);
    }

    #[test]
    fn parse_reply_port_zero_length_field() {
        // A zero-length port field yields an empty digit string, not a panic.
        assert_eq!(parse_reply_port(b"EJSON\x00"), None);
    }

    #[test]
    fn probe_socket_binds_ephemeral_port() {
        let socket = ProbeSocket::new(Duration::from_millis(50)).unwrap();
        let local = socket.socket.local_addr().unwrap();
        assert_ne!(local.port(), 0);
    }

    #[test]
    fn reply_iterator_yields_one_reply_per_valid_datagram() {
        let probe = ProbeSocket::new(Duration::from_millis(200)).unwrap();
        let port = probe.socket.local_addr().unwrap().port();

        // Stand in for answering servers: two valid replies with a piece of
        // unrelated traffic between them.
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"EJSON\x049000", ("127.0.0.1", port)).unwrap();
        sender.send_to(b"not a reply", ("127.0.0.1", port)).unwrap();
        sender.send_to(b"EJSON\x0280", ("127.0.0.1", port)).unwrap();

        let replies: Vec<ProbeReply> = ProbeReplyIterator::new(&probe.socket)
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(
            replies,
            vec![
                ProbeReply {
                    host: "127.0.0.1".to_string(),
                    port: 9000,
                },
                ProbeReply {
                    host: "127.0.0.1".to_string(),
                    port: 80,
                },
            ]
        );
    }

    #[test]
    fn reply_iterator_times_out_empty_without_traffic() {
        let probe = ProbeSocket::new(Duration::from_millis(100)).unwrap();
        let replies: Vec<_> = ProbeReplyIterator::new(&probe.socket).collect();
        assert!(replies.is_empty());
    }
}
