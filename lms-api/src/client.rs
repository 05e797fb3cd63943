//! Client configuration and the query funnel.
//!
//! `LmsClient` carries the configuration surface (server location, player
//! association, timeouts, error mode) and funnels every remote call through
//! [`LmsClient::query`]. Changing the server location or the player name
//! goes through explicit setters so the derived state (query endpoint,
//! player id) is always re-resolved along with it.

use std::time::Duration;

use rpc_client::RpcClient;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ApiError, Result};

/// Path of the JSON-RPC endpoint on the server.
const QUERY_PATH: &str = "jsonrpc.js";

/// Default window for the discovery scan when no server is configured.
const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default timeout for one HTTP exchange with the server.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for one LMS server, optionally associated with one player.
///
/// Built with [`LmsClient::builder`]. When no host and port are supplied the
/// builder scans the local network and adopts the first server that answers;
/// when a player name is supplied it is resolved to a player id against the
/// server's player list.
///
/// All queries run against the configured server; player-level calls address
/// the associated player. By default transport errors are returned to the
/// caller; with `suppress_transport_errors` they are logged and degraded to
/// an empty result instead, uniformly for every call.
#[derive(Debug, Clone)]
pub struct LmsClient {
    host: Option<String>,
    port: Option<u16>,
    player_name: Option<String>,
    player_id: Option<String>,
    scan_timeout: Duration,
    request_timeout: Duration,
    suppress_transport_errors: bool,
    server_base_url: Option<String>,
    server_query_url: Option<String>,
    rpc: RpcClient,
}

/// Builder for [`LmsClient`].
#[derive(Debug, Default)]
pub struct LmsClientBuilder {
    host: Option<String>,
    port: Option<u16>,
    player_name: Option<String>,
    player_id: Option<String>,
    scan_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    suppress_transport_errors: bool,
}

impl LmsClientBuilder {
    /// Server hostname or IP address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Server HTTP port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Player name to resolve into a player id at build time.
    pub fn player_name(mut self, name: impl Into<String>) -> Self {
        self.player_name = Some(name.into());
        self
    }

    /// Player id in hex, as reported by the server.
    pub fn player_id(mut self, id: impl Into<String>) -> Self {
        self.player_id = Some(id.into());
        self
    }

    /// How long to scan the local network when no host/port is configured.
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = Some(timeout);
        self
    }

    /// Timeout for each HTTP exchange with the server.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Log transport errors and return empty results instead of surfacing
    /// them. Off by default.
    pub fn suppress_transport_errors(mut self, on: bool) -> Self {
        self.suppress_transport_errors = on;
        self
    }

    /// Resolve the server (discovering one if necessary) and the player id,
    /// and return the configured client.
    ///
    /// Never fails: an unreachable or undiscovered server leaves the client
    /// without a query endpoint, which queries report at call time.
    pub fn build(self) -> LmsClient {
        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let mut client = LmsClient {
            host: self.host,
            port: self.port,
            player_name: None,
            player_id: self.player_id,
            scan_timeout: self.scan_timeout.unwrap_or(DEFAULT_SCAN_TIMEOUT),
            request_timeout,
            suppress_transport_errors: self.suppress_transport_errors,
            server_base_url: None,
            server_query_url: None,
            rpc: RpcClient::with_timeout(request_timeout),
        };

        client.set_server();
        if let Some(name) = self.player_name {
            client.set_player_name(name);
        }
        client
    }
}

impl LmsClient {
    /// Start building a client.
    pub fn builder() -> LmsClientBuilder {
        LmsClientBuilder::default()
    }

    /// Configured server host, if any.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Configured server port, if any.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Associated player name, if one was set.
    pub fn player_name(&self) -> Option<&str> {
        self.player_name.as_deref()
    }

    /// Associated player id, if known.
    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    /// Base URL of the server, e.g. `http://192.168.1.10:9000/`.
    pub fn server_base_url(&self) -> Option<&str> {
        self.server_base_url.as_deref()
    }

    /// Full query endpoint URL, e.g. `http://192.168.1.10:9000/jsonrpc.js`.
    pub fn server_query_url(&self) -> Option<&str> {
        self.server_query_url.as_deref()
    }

    /// Whether transport errors are being suppressed.
    pub fn suppresses_transport_errors(&self) -> bool {
        self.suppress_transport_errors
    }

    /// Change the server host and re-derive the query endpoint.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
        self.set_server();
    }

    /// Change the server port and re-derive the query endpoint.
    pub fn set_port(&mut self, port: u16) {
        self.port = Some(port);
        self.set_server();
    }

    /// Associate a player by name and re-resolve its id against the server.
    ///
    /// Resolution failure keeps any previously known id and logs a warning.
    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player_name = Some(name.into());
        self.resolve_player_id();
    }

    /// Associate a player directly by id. No resolution is performed.
    pub fn set_player_id(&mut self, id: impl Into<String>) {
        self.player_id = Some(id.into());
    }

    /// Resolve the server location into the query endpoint.
    ///
    /// With a configured host and port, this only re-derives the URLs.
    /// Otherwise the local network is scanned for up to the scan timeout and
    /// the first server found is adopted; finding none leaves the endpoint
    /// unset and is logged, not fatal. Changing host or port through the
    /// setters re-runs this automatically; call it directly after discovery
    /// conditions change (e.g. the server moved).
    pub fn set_server(&mut self) {
        if self.host.is_none() || self.port.is_none() {
            let servers = lms_discovery::get_with_timeout(self.scan_timeout);
            match servers.first() {
                Some(server) => {
                    self.host = Some(server.host.clone());
                    self.port = Some(server.port);
                }
                None => {
                    warn!("server search returned no results; is there an LMS on the local network?");
                }
            }
        }

        match (self.host.as_deref(), self.port) {
            (Some(host), Some(port)) => {
                let base = format!("http://{}:{}/", host, port);
                self.server_query_url = Some(format!("{}{}", base, QUERY_PATH));
                self.server_base_url = Some(base);
            }
            _ => {
                self.server_base_url = None;
                self.server_query_url = None;
            }
        }
    }

    /// Issue one query against the server.
    ///
    /// `target` names the player a command applies to; the empty string
    /// addresses the server itself. Returns the `result` value of the
    /// response.
    ///
    /// With no query endpoint configured this performs no network I/O at
    /// all: it logs a warning and returns an empty object. Transport and
    /// decoding failures surface as errors unless the client suppresses
    /// them, in which case they degrade to an empty object as well.
    pub fn query(&self, target: &str, command: &[Value]) -> Result<Value> {
        let url = match self.server_query_url.as_deref() {
            Some(url) => url,
            None => {
                warn!("server query url is not set");
                return Ok(Value::Object(Map::new()));
            }
        };

        debug!(player = target, ?command, "sending query");
        match self.rpc.call(url, target, command) {
            Ok(result) => Ok(result),
            Err(e) if self.suppress_transport_errors => {
                warn!("error making connection to server: {}", e);
                Ok(Value::Object(Map::new()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Issue a query addressed at the associated player.
    ///
    /// Falls back to the empty (server-level) target when no player id is
    /// configured, matching how the server treats player-less commands.
    pub fn player_query(&self, command: &[Value]) -> Result<Value> {
        let target = self.player_id.clone().unwrap_or_default();
        self.query(&target, command)
    }

    /// Player-addressed query that degrades every failure to an empty
    /// object. Used where a missing answer is recoverable.
    pub(crate) fn player_query_or_empty(&self, command: &[Value]) -> Value {
        match self.player_query(command) {
            Ok(result) => result,
            Err(e) => {
                warn!("query failed: {}", e);
                Value::Object(Map::new())
            }
        }
    }

    /// Loud precondition for commands that cannot run without a player.
    pub(crate) fn require_player_id(&self) -> Result<String> {
        match self.player_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(ApiError::Config("player_id is not set".to_string())),
        }
    }

    /// Request timeout currently in effect.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Discovery scan window currently in effect.
    pub fn scan_timeout(&self) -> Duration {
        self.scan_timeout
    }

    /// Change the per-request timeout. Takes effect on the next query.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
        self.rpc = RpcClient::with_timeout(timeout);
    }

    /// Change the scan window used the next time `set_server` has to
    /// discover a server.
    pub fn set_scan_timeout(&mut self, timeout: Duration) {
        self.scan_timeout = timeout;
    }

    /// Toggle suppression of transport errors for every subsequent call.
    pub fn set_suppress_transport_errors(&mut self, on: bool) {
        self.suppress_transport_errors = on;
    }

    fn resolve_player_id(&mut self) {
        let Some(name) = self.player_name.clone() else {
            return;
        };

        match self.players() {
            Ok(players) => {
                for player in players {
                    if player.name == name {
                        self.player_id = Some(player.playerid);
                        break;
                    }
                }
            }
            Err(e) => warn!("could not list players: {}", e),
        }

        let resolved = matches!(self.player_id.as_deref(), Some(id) if !id.is_empty());
        if !resolved {
            warn!(player = %name, "could not set player_id for player");
        }
    }
}
