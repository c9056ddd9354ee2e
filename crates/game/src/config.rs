use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5555;
pub const DEFAULT_LOBBY_PORT: u16 = 5556;
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Fixed rules and geometry of the playfield. Shared by both peers of a
/// networked match, so the values must agree between compatible builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub screen_width: f32,
    pub screen_height: f32,

    pub paddle_width: f32,
    pub paddle_height: f32,
    pub paddle_inset: f32,
    pub paddle_speed: f32,

    pub ball_size: f32,
    pub serve_vertical_ratio: f32,
    pub speed_increase_per_hit: f32,
    pub max_ball_speed: f32,
    pub trail_length: usize,

    pub ai_deadzone: f32,
    pub win_score: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            screen_width: 800.0,
            screen_height: 600.0,

            paddle_width: 12.0,
            paddle_height: 110.0,
            paddle_inset: 50.0,
            paddle_speed: 440.0,

            ball_size: 12.0,
            serve_vertical_ratio: 0.55,
            speed_increase_per_hit: 1.035,
            max_ball_speed: 900.0,
            trail_length: 10,

            ai_deadzone: 6.0,
            win_score: 7,
        }
    }
}

impl GameConfig {
    pub fn center(&self) -> glam::Vec2 {
        glam::Vec2::new(self.screen_width / 2.0, self.screen_height / 2.0)
    }

    /// Highest y a paddle's top edge may take.
    pub fn paddle_max_y(&self) -> f32 {
        (self.screen_height - self.paddle_height).max(0.0)
    }

    pub fn ball_max_y(&self) -> f32 {
        (self.screen_height - self.ball_size).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Maps a persisted index onto a preset. Out of range indices fall back to
    /// the default preset.
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    pub fn index(self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    /// `(ai_speed, ball_base_speed)` in px/s.
    pub fn speeds(self) -> (f32, f32) {
        match self {
            Difficulty::Easy => (300.0, 380.0),
            Difficulty::Medium => (380.0, 420.0),
            Difficulty::Hard => (460.0, 480.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Everything a match needs, captured once at match start and never mutated
/// while the match runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub game: GameConfig,
    pub difficulty: Difficulty,
    pub ai_speed: f32,
    pub ball_base_speed: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new(GameConfig::default(), Difficulty::default())
    }
}

impl MatchConfig {
    pub fn new(game: GameConfig, difficulty: Difficulty) -> Self {
        let (ai_speed, ball_base_speed) = difficulty.speeds();
        Self {
            game,
            difficulty,
            ai_speed,
            ball_base_speed,
        }
    }

    pub fn with_difficulty(difficulty: Difficulty) -> Self {
        Self::new(GameConfig::default(), difficulty)
    }
}

#[derive(Debug, Clone)]
pub struct NetConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Upper bound on a single send. A peer that stops reading long enough
    /// to fill the socket buffers is treated as lost after this long.
    pub write_timeout: Duration,
    pub accept_poll_interval: Duration,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_millis(100),
            write_timeout: Duration::from_millis(100),
            accept_poll_interval: Duration::from_millis(50),
        }
    }
}

impl NetConfig {
    /// Loopback config on an OS-assigned port.
    pub fn loopback() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..Default::default()
        }
    }
}
