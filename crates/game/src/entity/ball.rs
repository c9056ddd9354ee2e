use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;

use crate::config::GameConfig;

use super::{Rect, Side};

#[derive(Debug, Clone)]
pub struct Ball {
    /// Top-left corner of the ball's bounding box.
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    trail: VecDeque<Vec2>,
    trail_capacity: usize,
}

impl Ball {
    pub fn new(pos: Vec2, vel: Vec2, config: &GameConfig) -> Self {
        Self {
            pos,
            vel,
            size: config.ball_size,
            trail: VecDeque::with_capacity(config.trail_length),
            trail_capacity: config.trail_length,
        }
    }

    /// A ball resting at the centre of the field.
    pub fn centered(config: &GameConfig) -> Self {
        Self::new(config.center(), Vec2::ZERO, config)
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size, self.size)
    }

    pub fn center_y(&self) -> f32 {
        self.pos.y + self.size / 2.0
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    pub fn trail(&self) -> impl Iterator<Item = &Vec2> {
        self.trail.iter()
    }

    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    pub fn clear_trail(&mut self) {
        self.trail.clear();
    }

    /// `pos += vel * dt`, without any collision handling.
    pub fn integrate(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }

    /// Records the trail sample, integrates and bounces off the top and bottom
    /// walls. Returns true when a wall was touched.
    pub fn advance(&mut self, dt: f32, config: &GameConfig) -> bool {
        self.push_trail();
        self.travel(dt, config)
    }

    /// Like `advance` but without a trail sample, for the later slices of a
    /// subdivided step.
    pub fn travel(&mut self, dt: f32, config: &GameConfig) -> bool {
        self.integrate(dt);
        self.bounce_off_walls(config.ball_max_y())
    }

    fn bounce_off_walls(&mut self, max_y: f32) -> bool {
        if self.pos.y <= 0.0 {
            self.pos.y = 0.0;
            self.vel.y = -self.vel.y;
            true
        } else if self.pos.y >= max_y {
            self.pos.y = max_y;
            self.vel.y = -self.vel.y;
            true
        } else {
            false
        }
    }

    /// Overwrites position and velocity from an external source, keeping the
    /// trail so mirrored balls still draw one.
    pub fn place(&mut self, pos: Vec2, vel: Vec2) {
        self.push_trail();
        self.pos = pos;
        self.vel = vel;
    }

    fn push_trail(&mut self) {
        if self.trail_capacity == 0 {
            return;
        }
        if self.trail.len() >= self.trail_capacity {
            self.trail.pop_front();
        }
        self.trail.push_back(self.pos);
    }

    /// Back to the centre, serving toward `toward` with a random vertical sign.
    pub fn reset<R: Rng + ?Sized>(
        &mut self,
        toward: Side,
        base_speed: f32,
        config: &GameConfig,
        rng: &mut R,
    ) {
        let vertical = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.pos = config.center();
        self.vel = Vec2::new(
            base_speed * toward.sign(),
            base_speed * config.serve_vertical_ratio * vertical,
        );
        self.trail.clear();
    }

    pub fn fully_past_left(&self) -> bool {
        self.pos.x + self.size < 0.0
    }

    pub fn fully_past_right(&self, screen_width: f32) -> bool {
        self.pos.x > screen_width
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn integration_matches_reference_values() {
        let config = GameConfig::default();
        let mut ball = Ball::new(Vec2::new(400.0, 300.0), Vec2::new(420.0, 231.0), &config);

        ball.integrate(0.016);

        assert!((ball.pos.x - 406.72).abs() < 1e-3);
        assert!((ball.pos.y - 303.696).abs() < 1e-3);
    }

    #[test]
    fn wall_bounce_keeps_magnitude_and_clamps() {
        let config = GameConfig::default();

        let mut top = Ball::new(Vec2::new(400.0, 2.0), Vec2::new(300.0, -250.0), &config);
        assert!(top.advance(0.016, &config));
        assert_eq!(top.pos.y, 0.0);
        assert_eq!(top.vel.y, 250.0);
        assert_eq!(top.vel.x, 300.0);

        let max_y = config.ball_max_y();
        let mut bottom = Ball::new(Vec2::new(400.0, max_y - 1.0), Vec2::new(-300.0, 250.0), &config);
        assert!(bottom.advance(0.016, &config));
        assert_eq!(bottom.pos.y, max_y);
        assert_eq!(bottom.vel.y, -250.0);
    }

    #[test]
    fn no_bounce_in_open_field() {
        let config = GameConfig::default();
        let mut ball = Ball::new(Vec2::new(400.0, 300.0), Vec2::new(300.0, 100.0), &config);
        assert!(!ball.advance(0.016, &config));
    }

    #[test]
    fn trail_is_bounded() {
        let config = GameConfig::default();
        let mut ball = Ball::new(Vec2::new(100.0, 300.0), Vec2::new(10.0, 0.0), &config);
        for _ in 0..25 {
            ball.advance(0.016, &config);
        }
        assert_eq!(ball.trail_len(), config.trail_length);
    }

    #[test]
    fn reset_serves_toward_side_from_exact_center() {
        let config = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut ball = Ball::new(Vec2::new(-40.0, 12.0), Vec2::new(-700.0, 10.0), &config);
        ball.advance(0.016, &config);

        ball.reset(Side::Left, 420.0, &config, &mut rng);
        assert_eq!(ball.pos, Vec2::new(400.0, 300.0));
        assert_eq!(ball.vel.x, -420.0);
        assert!((ball.vel.y.abs() - 231.0).abs() < 1e-3);
        assert_eq!(ball.trail_len(), 0);

        ball.reset(Side::Right, 380.0, &config, &mut rng);
        assert_eq!(ball.vel.x, 380.0);
    }

    #[test]
    fn exit_detection_requires_full_exit() {
        let config = GameConfig::default();
        let mut ball = Ball::centered(&config);
        ball.pos.x = -5.0;
        assert!(!ball.fully_past_left());
        ball.pos.x = -12.5;
        assert!(ball.fully_past_left());
        ball.pos.x = 800.0;
        assert!(!ball.fully_past_right(800.0));
        ball.pos.x = 800.5;
        assert!(ball.fully_past_right(800.0));
    }
}
