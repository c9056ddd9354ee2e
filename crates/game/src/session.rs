use std::net::{Ipv4Addr, SocketAddr};

use crate::ai::AiController;
use crate::config::{MatchConfig, NetConfig};
use crate::entity::{MoveDirection, Side};
use crate::error::{LobbyError, NetError, SessionError};
use crate::event::{EventQueue, PendingEvent};
use crate::lobby::{LobbyBackend, MatchmakingClient, Role};
use crate::net::{ConnectionState, NetworkClient, NetworkHost, NetworkStats};
use crate::simulation::{Match, MatchPhase, MatchSnapshot};

const EVENT_CAPACITY: usize = 64;

/// Who owns the simulation truth for a running session.
pub enum Authority {
    /// Single machine against the AI.
    Local,
    /// Runs physics and streams state to the client.
    Host(NetworkHost),
    /// Mirrors host state and only reports its own paddle.
    Client(NetworkClient),
}

impl Authority {
    pub fn role(&self) -> Option<Role> {
        match self {
            Authority::Local => None,
            Authority::Host(_) => Some(Role::Host),
            Authority::Client(_) => Some(Role::Client),
        }
    }

    /// Turns a public-queue pairing into a transport. `host` is the listener
    /// this peer advertised while queued: the host role keeps it for the
    /// peer to connect to, the client role closes it and connects to `peer`.
    pub fn from_match(
        role: Role,
        peer: SocketAddr,
        mut host: NetworkHost,
        config: &NetConfig,
    ) -> Result<Self, NetError> {
        match role {
            Role::Host => {
                log::info!("hosting matched opponent from {}", peer);
                Ok(Authority::Host(host))
            }
            Role::Client => {
                host.close();
                NetworkClient::connect(peer, config).map(Authority::Client)
            }
        }
    }
}

/// A match bound to an authority mode, with its event buffer.
pub struct GameSession {
    game: Match,
    authority: Authority,
    ai: AiController,
    events: EventQueue,
    /// Keeps a registered lobby code alive for as long as the session runs.
    lobby: Option<MatchmakingClient>,
}

impl GameSession {
    pub fn local(config: MatchConfig) -> Self {
        Self::with_match(Match::new(config), Authority::Local)
    }

    pub fn local_seeded(config: MatchConfig, seed: u64) -> Self {
        Self::with_match(Match::with_seed(config, seed), Authority::Local)
    }

    /// The match starts once a client connects.
    pub fn host(config: MatchConfig, host: NetworkHost) -> Self {
        Self::with_match(Match::new(config), Authority::Host(host))
    }

    pub fn client(config: MatchConfig, client: NetworkClient) -> Self {
        Self::with_match(Match::new(config), Authority::Client(client))
    }

    /// Hosts with the host's code registered in `lobby`, so the opponent can
    /// join by code. The code is withdrawn when the session closes.
    pub fn host_listed(
        config: MatchConfig,
        host: NetworkHost,
        lobby: impl LobbyBackend + 'static,
    ) -> Result<Self, LobbyError> {
        let listing = MatchmakingClient::new(lobby, host.local_addr());
        listing.register_code(host.code())?;

        let mut session = Self::host(config, host);
        session.lobby = Some(listing);
        Ok(session)
    }

    /// Resolves a lobby code and connects to the host behind it.
    pub fn join_code(
        config: MatchConfig,
        code: &str,
        lobby: impl LobbyBackend + 'static,
        net: &NetConfig,
    ) -> Result<Self, SessionError> {
        let unlisted = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let addr = MatchmakingClient::new(lobby, unlisted).resolve_code(code)?;
        log::info!("lobby code resolved to {}", addr);
        let client = NetworkClient::connect(addr, net)?;
        Ok(Self::client(config, client))
    }

    /// Session for a public-queue pairing; see [`Authority::from_match`].
    pub fn matched(
        config: MatchConfig,
        role: Role,
        peer: SocketAddr,
        host: NetworkHost,
        net: &NetConfig,
    ) -> Result<Self, NetError> {
        let authority = Authority::from_match(role, peer, host, net)?;
        Ok(Self::with_match(Match::new(config), authority))
    }

    fn with_match(mut game: Match, authority: Authority) -> Self {
        let ai = AiController::new(game.config().game.ai_deadzone);
        let player_speed = game.config().game.paddle_speed;

        match authority {
            Authority::Local => game.start(),
            Authority::Host(_) => {}
            Authority::Client(_) => {
                game.set_paddle_speed(Side::Right, player_speed);
                game.start();
            }
        }

        Self {
            game,
            authority,
            ai,
            events: EventQueue::new(EVENT_CAPACITY),
            lobby: None,
        }
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Paddle driven by this machine's input.
    pub fn local_side(&self) -> Side {
        match self.authority {
            Authority::Local | Authority::Host(_) => Side::Left,
            Authority::Client(_) => Side::Right,
        }
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        match &self.authority {
            Authority::Local => None,
            Authority::Host(host) => Some(host.state()),
            Authority::Client(client) => Some(client.state()),
        }
    }

    pub fn network_stats(&self) -> Option<NetworkStats> {
        match &self.authority {
            Authority::Local => None,
            Authority::Host(host) => Some(host.stats()),
            Authority::Client(client) => Some(client.stats()),
        }
    }

    /// One simulation tick with the local player's direction.
    pub fn tick(&mut self, dt: f32, local: MoveDirection) {
        let events = match &mut self.authority {
            Authority::Local => {
                let right = self.ai.decide(
                    self.game.ball().center_y(),
                    self.game.paddle(Side::Right).center_y(),
                );
                self.game.tick(dt, local, right)
            }
            Authority::Host(host) => {
                if self.game.phase() == MatchPhase::Menu && host.state().is_connected() {
                    log::info!("opponent connected, starting match");
                    self.game.start();
                }
                if let Some(y) = host.poll_remote_paddle() {
                    self.game.set_paddle_y(Side::Right, y);
                }
                let events = self.game.tick(dt, local, MoveDirection::None);
                if host.state().is_connected() {
                    host.send_state(self.game.state_update());
                }
                events
            }
            Authority::Client(client) => {
                self.game.move_paddle(Side::Right, local, dt);
                if client.state().is_connected() {
                    client.send_paddle(self.game.paddle(Side::Right).y);
                }
                match client.poll_state() {
                    Some(state) => self.game.apply_state(&state),
                    None => Vec::new(),
                }
            }
        };

        let tick = self.game.tick_count();
        self.events.extend(tick, events);
    }

    /// Absolute placement of the local paddle, e.g. from a pointer drag.
    pub fn set_local_paddle_y(&mut self, y: f32) {
        let side = self.local_side();
        self.game.set_paddle_y(side, y);
    }

    /// Restarts the match where this machine has the authority to. A client
    /// waits for the host to restart instead.
    pub fn restart(&mut self) -> bool {
        match &self.authority {
            Authority::Local => {
                self.game.restart();
                true
            }
            Authority::Host(host) if host.state().is_connected() => {
                self.game.restart();
                true
            }
            Authority::Host(_) | Authority::Client(_) => false,
        }
    }

    pub fn drain_events(&mut self) -> Vec<PendingEvent> {
        self.events.drain()
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        self.game.snapshot()
    }

    /// Short user-facing description of where the session stands.
    pub fn status(&self) -> String {
        if let Some(winner) = self.game.winner() {
            let scores = self.game.scores();
            let who = if winner == self.local_side() {
                "you win"
            } else {
                "you lose"
            };
            return format!("game over, {} {}-{}", who, scores.left, scores.right);
        }

        match &self.authority {
            Authority::Local => format!(
                "playing against AI ({})",
                self.game.config().difficulty.as_str()
            ),
            Authority::Host(host) => match host.state() {
                ConnectionState::Listening => format!(
                    "waiting for opponent on port {} (code {})",
                    host.local_addr().port(),
                    host.code()
                ),
                state => format!("host: {}", state.describe()),
            },
            Authority::Client(client) => {
                format!("client of {}: {}", client.peer_addr(), client.state().describe())
            }
        }
    }

    pub fn close(&mut self) {
        self.lobby = None;
        match &mut self.authority {
            Authority::Local => {}
            Authority::Host(host) => host.close(),
            Authority::Client(client) => client.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_session_plays_against_ai() {
        let mut session = GameSession::local_seeded(MatchConfig::default(), 11);
        assert_eq!(session.game().phase(), MatchPhase::Playing);
        assert_eq!(session.local_side(), Side::Left);
        assert!(session.connection_state().is_none());

        for _ in 0..1800 {
            session.tick(1.0 / 60.0, MoveDirection::None);
        }

        let scores = session.game().scores();
        assert!(scores.left + scores.right > 0);
        let events = session.drain_events();
        assert!(!events.is_empty());
        assert!(session.drain_events().is_empty());
        assert!(session.status().contains("medium") || session.status().starts_with("game over"));
    }

    #[test]
    fn ai_tracks_the_ball() {
        let mut session = GameSession::local_seeded(MatchConfig::default(), 12);
        session.game.ball_mut().pos.y = 20.0;
        session.game.ball_mut().vel = glam::Vec2::new(100.0, 0.0);
        let before = session.game().paddle(Side::Right).y;

        session.tick(0.1, MoveDirection::None);

        assert!(session.game().paddle(Side::Right).y < before);
    }

    #[test]
    fn local_restart_clears_scores() {
        let mut session = GameSession::local_seeded(MatchConfig::default(), 13);
        for _ in 0..900 {
            session.tick(1.0 / 60.0, MoveDirection::None);
        }
        assert!(session.restart());
        assert_eq!(session.game().scores().left, 0);
        assert_eq!(session.game().scores().right, 0);
    }
}
