pub mod ai;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod lobby;
pub mod net;
pub mod physics;
pub mod session;
pub mod simulation;

pub use ai::{AiController, DemoAi};
pub use config::{
    DEFAULT_LOBBY_PORT, DEFAULT_PORT, DEFAULT_TICK_RATE, Difficulty, GameConfig, MatchConfig,
    NetConfig,
};
pub use entity::{Ball, MoveDirection, Paddle, Rect, Side};
pub use error::{LobbyError, NetError, ProtocolError, SessionError};
pub use event::{EventQueue, GameEvent, PendingEvent, Shake};
pub use lobby::{
    LobbyBackend, LobbyServer, Matchmaker, MatchmakingClient, QueueStatus, Registry, RemoteLobby,
    Role,
};
pub use net::{
    ConnectionState, LineReassembler, NetworkClient, NetworkHost, NetworkStats, StateUpdate,
    WireMessage,
};
pub use physics::{Scoreboard, StepOutcome};
pub use session::{Authority, GameSession};
pub use simulation::{FixedTimestep, Match, MatchPhase, MatchSnapshot};
