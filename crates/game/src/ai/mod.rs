mod demo;

pub use demo::DemoAi;

use crate::entity::MoveDirection;

/// Tracks the ball's centre with a small deadzone to avoid jitter. Has no
/// prediction and no noise, so the same inputs always give the same output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiController {
    pub deadzone: f32,
}

impl Default for AiController {
    fn default() -> Self {
        Self { deadzone: 6.0 }
    }
}

impl AiController {
    pub fn new(deadzone: f32) -> Self {
        Self {
            deadzone: deadzone.max(0.0),
        }
    }

    pub fn decide(&self, ball_center_y: f32, paddle_center_y: f32) -> MoveDirection {
        if ball_center_y < paddle_center_y - self.deadzone {
            MoveDirection::Up
        } else if ball_center_y > paddle_center_y + self.deadzone {
            MoveDirection::Down
        } else {
            MoveDirection::None
        }
    }
}
