mod collision;
mod scoring;

pub use collision::{MAX_BOUNCE_ANGLE, hit_offset, paddle_contact, reflect};
pub use scoring::Scoreboard;

use crate::config::GameConfig;
use crate::entity::{Ball, Paddle, Side};

/// Upper bound on the slices one step is cut into.
pub const MAX_SUBSTEPS: u32 = 64;

/// What happened to the ball during one physics step. At most one outcome is
/// reported per tick, in order of precedence: exit, paddle, wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Open,
    WallBounce,
    PaddleHit(Side),
    /// The ball left the field; `scorer` is the side that earns the point.
    Exit { scorer: Side },
}

/// Moves the ball one step and resolves walls, paddles and exits.
///
/// A step that would carry the ball further than a paddle's width plus its
/// own size is cut into equal slices so a fast ball cannot tunnel through a
/// paddle. The step ends at the first slice that exits or hits a paddle.
pub fn step_ball(
    ball: &mut Ball,
    left: &Paddle,
    right: &Paddle,
    config: &GameConfig,
    dt: f32,
) -> StepOutcome {
    let slices = substeps(ball.speed() * dt, config);
    let slice_dt = dt / slices as f32;
    let mut touched_wall = false;

    for slice in 0..slices {
        touched_wall |= if slice == 0 {
            ball.advance(slice_dt, config)
        } else {
            ball.travel(slice_dt, config)
        };

        if ball.fully_past_left() {
            return StepOutcome::Exit {
                scorer: Side::Right,
            };
        }
        if ball.fully_past_right(config.screen_width) {
            return StepOutcome::Exit { scorer: Side::Left };
        }

        for paddle in [left, right] {
            if paddle_contact(ball, paddle) {
                reflect(ball, paddle, config);
                return StepOutcome::PaddleHit(paddle.side);
            }
        }
    }

    if touched_wall {
        StepOutcome::WallBounce
    } else {
        StepOutcome::Open
    }
}

/// Slices needed so none moves the ball further than `paddle_width + ball_size`.
fn substeps(distance: f32, config: &GameConfig) -> u32 {
    let reach = config.paddle_width + config.ball_size;
    if reach <= 0.0 || distance.is_nan() || distance <= reach {
        return 1;
    }
    (distance / reach).ceil().min(MAX_SUBSTEPS as f32) as u32
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;

    fn field() -> (GameConfig, Paddle, Paddle) {
        let config = GameConfig::default();
        let left = Paddle::new(Side::Left, &config, 440.0);
        let right = Paddle::new(Side::Right, &config, 380.0);
        (config, left, right)
    }

    #[test]
    fn exit_takes_precedence_over_wall() {
        let (config, left, right) = field();
        let mut ball = Ball::new(Vec2::new(-11.0, 1.0), Vec2::new(-300.0, -300.0), &config);

        let outcome = step_ball(&mut ball, &left, &right, &config, 0.016);
        assert_eq!(
            outcome,
            StepOutcome::Exit {
                scorer: Side::Right
            }
        );
    }

    #[test]
    fn right_exit_scores_for_left() {
        let (config, left, right) = field();
        let mut ball = Ball::new(Vec2::new(799.0, 300.0), Vec2::new(300.0, 0.0), &config);

        let outcome = step_ball(&mut ball, &left, &right, &config, 0.016);
        assert_eq!(outcome, StepOutcome::Exit { scorer: Side::Left });
    }

    #[test]
    fn paddle_hit_takes_precedence_over_wall() {
        let (config, mut left, right) = field();
        left.set_y(0.0);
        let mut ball = Ball::new(Vec2::new(60.0, 1.0), Vec2::new(-300.0, -200.0), &config);

        let outcome = step_ball(&mut ball, &left, &right, &config, 0.016);
        assert_eq!(outcome, StepOutcome::PaddleHit(Side::Left));
        assert!(ball.vel.x > 0.0);
        assert_eq!(ball.pos.y, 0.0);
    }

    #[test]
    fn fast_ball_cannot_tunnel_through_paddle() {
        let (config, left, right) = field();
        // 90 px in one step; without slicing it would land past the paddle
        // face with no overlapping frame.
        let mut ball = Ball::new(Vec2::new(100.0, 294.0), Vec2::new(-900.0, 0.0), &config);

        let outcome = step_ball(&mut ball, &left, &right, &config, 0.1);
        assert_eq!(outcome, StepOutcome::PaddleHit(Side::Left));
        assert!(ball.vel.x > 0.0);
        assert_eq!(ball.pos.x, left.facing_edge());
        assert_eq!(ball.trail_len(), 1);
    }

    #[test]
    fn slice_count_follows_travel_distance() {
        let config = GameConfig::default();
        assert_eq!(substeps(6.7, &config), 1);
        assert_eq!(substeps(24.0, &config), 1);
        assert_eq!(substeps(90.0, &config), 4);
        assert_eq!(substeps(f32::NAN, &config), 1);
        assert_eq!(substeps(1.0e9, &config), MAX_SUBSTEPS);
    }

    #[test]
    fn single_hit_per_contact() {
        let (config, left, right) = field();
        let mut ball = Ball::new(Vec2::new(63.0, 294.0), Vec2::new(-420.0, 0.0), &config);

        let first = step_ball(&mut ball, &left, &right, &config, 0.016);
        assert_eq!(first, StepOutcome::PaddleHit(Side::Left));
        let speed = ball.speed();

        let second = step_ball(&mut ball, &left, &right, &config, 0.001);
        assert_eq!(second, StepOutcome::Open);
        assert_eq!(ball.speed(), speed);
    }
}
