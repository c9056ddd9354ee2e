use std::io;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("invalid peer address {0:?}")]
    InvalidAddress(String),
    #[error("socket setup failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum LobbyError {
    #[error("invalid lobby code {0:?}")]
    InvalidCode(String),
    #[error("invalid or expired code")]
    CodeNotFound,
    #[error("lobby service unavailable: {0}")]
    Unavailable(String),
    #[error("lobby service rejected the request: {0}")]
    BadRequest(String),
}

/// Failure to turn a lobby result into a connected session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Lobby(#[from] LobbyError),
    #[error(transparent)]
    Net(#[from] NetError),
}
