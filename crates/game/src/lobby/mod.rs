mod code;
mod matchmaker;
mod registry;
mod service;

pub use code::{
    CODE_LENGTH, SESSION_ID_LENGTH, generate_code, generate_session_id, generate_token,
    normalize_code,
};
pub use matchmaker::{LobbyBackend, MIN_POLL_INTERVAL, Matchmaker, MatchmakingClient};
pub use registry::{CODE_TTL, QUEUE_TTL, QueueStatus, Registry, Role};
pub use service::{LOBBY_TIMEOUT, LobbyRequest, LobbyResponse, LobbyServer, RemoteLobby};
