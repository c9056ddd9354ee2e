use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::ValueEnum;

use pong::{Difficulty, NetConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

pub fn bind_config(bind: &str, port: u16) -> Result<NetConfig> {
    let bind_addr: IpAddr = bind
        .trim()
        .parse()
        .with_context(|| format!("invalid bind address '{}'", bind))?;

    Ok(NetConfig {
        bind_addr,
        port,
        ..Default::default()
    })
}

/// What `pong join` was pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    Addr(SocketAddr),
    Code(String),
}

/// A lobby code is six characters of `A-Z0-9` in any case. Anything else,
/// or anything with a dot or colon, is read as an address. A six-letter
/// bare hostname therefore needs its port spelled out.
pub fn join_target(input: &str, default_port: u16) -> Result<JoinTarget> {
    let trimmed = input.trim();
    if !trimmed.contains(['.', ':']) {
        if let Ok(code) = pong::lobby::normalize_code(trimmed) {
            return Ok(JoinTarget::Code(code));
        }
    }
    let addr = pong::net::parse_peer_addr(trimmed, default_port)?;
    Ok(JoinTarget::Addr(addr))
}

/// Lobby service address, `ip` or `ip:port`.
pub fn lobby_addr(input: &str) -> Result<SocketAddr> {
    pong::net::parse_peer_addr(input, pong::DEFAULT_LOBBY_PORT)
        .with_context(|| format!("invalid lobby address '{}'", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_args_map_to_presets() {
        assert_eq!(Difficulty::from(DifficultyArg::Easy), Difficulty::Easy);
        assert_eq!(Difficulty::from(DifficultyArg::Hard).speeds(), (460.0, 480.0));
    }

    #[test]
    fn bind_config_keeps_port() {
        let config = bind_config("127.0.0.1", 6000).unwrap();
        assert_eq!(config.bind_addr, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(config.port, 6000);
        assert!(bind_config("not an ip", 6000).is_err());
    }

    #[test]
    fn join_target_tells_codes_from_addresses() {
        assert_eq!(
            join_target(" ab12cd ", 5555).unwrap(),
            JoinTarget::Code("AB12CD".into())
        );
        assert_eq!(
            join_target("10.0.0.7", 5555).unwrap(),
            JoinTarget::Addr(SocketAddr::from(([10, 0, 0, 7], 5555)))
        );
        assert_eq!(
            join_target("127.0.0.1:6001", 5555).unwrap(),
            JoinTarget::Addr(SocketAddr::from(([127, 0, 0, 1], 6001)))
        );
        assert!(join_target("", 5555).is_err());
    }

    #[test]
    fn lobby_addr_defaults_to_lobby_port() {
        assert_eq!(
            lobby_addr("192.168.1.2").unwrap(),
            SocketAddr::from(([192, 168, 1, 2], pong::DEFAULT_LOBBY_PORT))
        );
        assert!(lobby_addr("").is_err());
    }
}
