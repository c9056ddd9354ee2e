use glam::Vec2;

use crate::entity::{Rect, Side};
use crate::physics::Scoreboard;

use super::game::MatchPhase;

/// Read-only copy of everything a presentation layer draws.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub phase: MatchPhase,
    pub tick: u64,
    pub ball_pos: Vec2,
    pub ball_vel: Vec2,
    pub ball_size: f32,
    /// Oldest sample first.
    pub trail: Vec<Vec2>,
    pub left: Rect,
    pub right: Rect,
    pub scores: Scoreboard,
    pub winner: Option<Side>,
    /// Field width and height.
    pub field: Vec2,
}

impl MatchSnapshot {
    pub fn ball_rect(&self) -> Rect {
        Rect::new(self.ball_pos.x, self.ball_pos.y, self.ball_size, self.ball_size)
    }

    pub fn paddle(&self, side: Side) -> Rect {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}
