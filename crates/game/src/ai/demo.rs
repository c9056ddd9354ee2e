use rand::Rng;

use crate::entity::{Ball, Paddle, Side};

/// Attract-mode controller. Plays a convincing but imperfect rally: leads the
/// ball while it approaches, wanders back toward the middle while it recedes,
/// and varies its pace so the two paddles never move in lockstep.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoAi {
    pub side: Side,
    /// Seconds of vertical travel to lead an approaching ball by.
    pub lookahead: f32,
    /// Half-width of the random band around mid-field used while idling.
    pub recenter_jitter: f32,
    pub deadzone: f32,
    /// Distance at which the paddle reaches full urgency.
    pub urgency_distance: f32,
    pub base_pace: f32,
    pub wobble: f32,
}

impl DemoAi {
    pub fn left() -> Self {
        Self {
            side: Side::Left,
            lookahead: 0.2,
            recenter_jitter: 50.0,
            deadzone: 15.0,
            urgency_distance: 100.0,
            base_pace: 0.7,
            wobble: 0.1,
        }
    }

    pub fn right() -> Self {
        Self {
            side: Side::Right,
            lookahead: 0.18,
            recenter_jitter: 40.0,
            deadzone: 12.0,
            urgency_distance: 80.0,
            base_pace: 0.75,
            wobble: 0.08,
        }
    }

    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Left => Self::left(),
            Side::Right => Self::right(),
        }
    }

    fn approaching(&self, ball: &Ball) -> bool {
        match self.side {
            Side::Left => ball.vel.x < 0.0,
            Side::Right => ball.vel.x > 0.0,
        }
    }

    /// Where the paddle centre wants to be this tick.
    pub fn target<R: Rng + ?Sized>(&self, ball: &Ball, screen_height: f32, rng: &mut R) -> f32 {
        if self.approaching(ball) {
            ball.center_y() + ball.vel.y * self.lookahead
        } else {
            let jitter = if self.recenter_jitter > 0.0 {
                rng.gen_range(-self.recenter_jitter..=self.recenter_jitter)
            } else {
                0.0
            };
            screen_height / 2.0 + jitter
        }
    }

    /// Signed vertical displacement for `paddle` this tick. Zero inside the
    /// deadzone. The caller applies it through a clamped absolute placement.
    pub fn step<R: Rng + ?Sized>(
        &self,
        ball: &Ball,
        paddle: &Paddle,
        screen_height: f32,
        dt: f32,
        rng: &mut R,
    ) -> f32 {
        let diff = self.target(ball, screen_height, rng) - paddle.center_y();
        if diff.abs() <= self.deadzone {
            return 0.0;
        }

        let urgency = (diff.abs() / self.urgency_distance).min(1.0);
        let wobble = if self.wobble > 0.0 {
            rng.gen_range(-self.wobble..=self.wobble)
        } else {
            0.0
        };
        let pace = self.base_pace + urgency * (1.0 - self.base_pace) + wobble;

        paddle.speed * pace * dt * diff.signum()
    }
}
