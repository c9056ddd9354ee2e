use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::Side;

/// Gameplay moments handed to presentation collaborators (particles, sound,
/// screen shake). `position` is where the effect should spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PaddleHit { side: Side, position: Vec2 },
    WallBounce { position: Vec2 },
    /// `side` is the side that earned the point.
    Score { side: Side, position: Vec2 },
    Win { side: Side, position: Vec2 },
}

/// Screen shake request: duration in seconds and amplitude in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shake {
    pub duration: f32,
    pub intensity: f32,
}

impl GameEvent {
    pub fn position(&self) -> Vec2 {
        match *self {
            Self::PaddleHit { position, .. }
            | Self::WallBounce { position }
            | Self::Score { position, .. }
            | Self::Win { position, .. } => position,
        }
    }

    pub fn side(&self) -> Option<Side> {
        match *self {
            Self::PaddleHit { side, .. } | Self::Score { side, .. } | Self::Win { side, .. } => {
                Some(side)
            }
            Self::WallBounce { .. } => None,
        }
    }

    pub fn shake(&self) -> Option<Shake> {
        match self {
            Self::PaddleHit { .. } => Some(Shake {
                duration: 0.12,
                intensity: 4.0,
            }),
            Self::Score { .. } => Some(Shake {
                duration: 0.25,
                intensity: 8.0,
            }),
            Self::WallBounce { .. } | Self::Win { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PaddleHit { .. } => "paddle hit",
            Self::WallBounce { .. } => "wall bounce",
            Self::Score { .. } => "score",
            Self::Win { .. } => "win",
        }
    }
}
