use std::f32::consts::FRAC_PI_3;

use glam::Vec2;

use crate::config::GameConfig;
use crate::entity::{Ball, Paddle, Side};

/// Largest deflection from the horizontal a paddle can impart.
pub const MAX_BOUNCE_ANGLE: f32 = FRAC_PI_3;

/// True when the ball overlaps the paddle while still travelling toward it.
/// A ball already heading away is left alone so one contact never counts twice.
pub fn paddle_contact(ball: &Ball, paddle: &Paddle) -> bool {
    let approaching = match paddle.side {
        Side::Left => ball.vel.x < 0.0,
        Side::Right => ball.vel.x > 0.0,
    };
    approaching && ball.rect().intersects(&paddle.rect())
}

/// Normalised hit offset in `[-1, 1]`; negative above the paddle centre.
pub fn hit_offset(ball: &Ball, paddle: &Paddle) -> f32 {
    let half = paddle.height / 2.0;
    if half <= 0.0 {
        return 0.0;
    }
    ((ball.center_y() - paddle.center_y()) / half).clamp(-1.0, 1.0)
}

/// Sends the ball back off `paddle`, steering by where it struck and speeding
/// it up by one increment.
pub fn reflect(ball: &mut Ball, paddle: &Paddle, config: &GameConfig) {
    ball.pos.x = match paddle.side {
        Side::Left => paddle.facing_edge(),
        Side::Right => paddle.facing_edge() - ball.size,
    };

    let offset = hit_offset(ball, paddle);
    let speed = (ball.speed() * config.speed_increase_per_hit).min(config.max_ball_speed);
    let angle = offset * MAX_BOUNCE_ANGLE;
    let direction = -paddle.side.sign();

    ball.vel = Vec2::new(angle.cos() * speed * direction, angle.sin() * speed);
}
