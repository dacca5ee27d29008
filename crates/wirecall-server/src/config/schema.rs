use std::time::Duration;

use serde::Deserialize;
use wirecall_core::error::{Result, WireCallError};

use crate::dispatch::EngineSettings;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub routes: RoutesSection,
}

impl RpcConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WireCallError::UnsupportedVersion);
        }
        self.server.validate()?;
        self.routes.validate()?;
        Ok(())
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            routes: RoutesSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Expiry of server-initiated client calls.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// How long a closing connection waits for in-flight calls.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(default = "default_max_pending_attachments")]
    pub max_pending_attachments: usize,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    /// WebSocket keepalive ping.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            call_timeout_ms: default_call_timeout_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            max_pending_attachments: default_max_pending_attachments(),
            outbound_queue: default_outbound_queue(),
            ping_interval_ms: default_ping_interval_ms(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(WireCallError::BadRequest(
                "server.listen must be a valid SocketAddr".into(),
            ));
        }
        if !(100..=600_000).contains(&self.call_timeout_ms) {
            return Err(WireCallError::BadRequest(
                "server.call_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if self.drain_timeout_ms > 60_000 {
            return Err(WireCallError::BadRequest(
                "server.drain_timeout_ms must be at most 60000".into(),
            ));
        }
        if !(1024..=256 * 1024 * 1024).contains(&self.max_frame_bytes) {
            return Err(WireCallError::BadRequest(
                "server.max_frame_bytes must be between 1024 and 268435456".into(),
            ));
        }
        if !(1..=4096).contains(&self.max_pending_attachments) {
            return Err(WireCallError::BadRequest(
                "server.max_pending_attachments must be between 1 and 4096".into(),
            ));
        }
        if !(1..=65_536).contains(&self.outbound_queue) {
            return Err(WireCallError::BadRequest(
                "server.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        if !(1000..=120_000).contains(&self.ping_interval_ms) {
            return Err(WireCallError::BadRequest(
                "server.ping_interval_ms must be between 1000 and 120000".into(),
            ));
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            max_frame_bytes: self.max_frame_bytes,
            max_pending_attachments: self.max_pending_attachments,
            outbound_queue: self.outbound_queue,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_call_timeout_ms() -> u64 {
    30_000
}
fn default_drain_timeout_ms() -> u64 {
    5_000
}
fn default_max_frame_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_max_pending_attachments() -> usize {
    64
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_ping_interval_ms() -> u64 {
    20_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutesSection {
    #[serde(default = "default_stream_route")]
    pub stream: String,
    #[serde(default = "default_plain_route")]
    pub plain: String,
    #[serde(default = "default_socket_route")]
    pub socket: String,
}

impl Default for RoutesSection {
    fn default() -> Self {
        Self {
            stream: default_stream_route(),
            plain: default_plain_route(),
            socket: default_socket_route(),
        }
    }
}

impl RoutesSection {
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("routes.stream", &self.stream),
            ("routes.plain", &self.plain),
            ("routes.socket", &self.socket),
        ];
        for (name, path) in all {
            if !path.starts_with('/') {
                return Err(WireCallError::BadRequest(format!("{name} must start with '/'")));
            }
            if matches!(path.as_str(), "/healthz" | "/readyz") {
                return Err(WireCallError::BadRequest(format!("{name} collides with ops route")));
            }
        }
        if self.stream == self.plain || self.stream == self.socket || self.plain == self.socket {
            return Err(WireCallError::BadRequest("routes must be distinct".into()));
        }
        Ok(())
    }
}

fn default_stream_route() -> String {
    "/rpc/stream".into()
}
fn default_plain_route() -> String {
    "/rpc".into()
}
fn default_socket_route() -> String {
    "/rpc/ws".into()
}
