mod client;
mod connection;
mod framing;
mod host;
mod link;
mod protocol;
mod stats;

pub use client::NetworkClient;
pub use connection::{ConnectionState, LinkStatus};
pub use framing::{LineReassembler, MAX_PENDING_BYTES};
pub use host::NetworkHost;
pub use protocol::{
    POSITION_LIMIT, SCORE_LIMIT, StateUpdate, VELOCITY_LIMIT, WireMessage, validate,
    validate_f32, validate_score,
};
pub use stats::{NetworkStats, SharedStats};

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::error::NetError;

/// Parses `ip`, `ip:port` or `host:port`, filling in `default_port` when no
/// port is given.
pub fn parse_peer_addr(input: &str, default_port: u16) -> Result<SocketAddr, NetError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(NetError::InvalidAddress(String::new()));
    }
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = input.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let candidate = if input.contains(':') {
        input.to_owned()
    } else {
        format!("{}:{}", input, default_port)
    };
    candidate
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| NetError::InvalidAddress(input.to_owned()))
}
