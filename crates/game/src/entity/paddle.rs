use crate::config::GameConfig;

use super::{MoveDirection, Rect, Side};

#[derive(Debug, Clone, PartialEq)]
pub struct Paddle {
    pub side: Side,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    max_y: f32,
}

impl Paddle {
    pub fn new(side: Side, config: &GameConfig, speed: f32) -> Self {
        let x = match side {
            Side::Left => config.paddle_inset,
            Side::Right => config.screen_width - config.paddle_inset - config.paddle_width,
        };

        let mut paddle = Self {
            side,
            x,
            y: 0.0,
            width: config.paddle_width,
            height: config.paddle_height,
            speed,
            max_y: config.paddle_max_y(),
        };
        paddle.reset();
        paddle
    }

    pub fn reset(&mut self) {
        self.y = self.max_y / 2.0;
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Edge the ball bounces off: right edge for the left paddle and vice versa.
    pub fn facing_edge(&self) -> f32 {
        match self.side {
            Side::Left => self.x + self.width,
            Side::Right => self.x,
        }
    }

    pub fn move_by(&mut self, direction: MoveDirection, dt: f32) {
        self.set_y(self.y + self.speed * direction.as_f32() * dt);
    }

    /// Absolute placement, used for pointer drags and network updates.
    pub fn set_y(&mut self, y: f32) {
        self.y = if y.is_finite() {
            y.clamp(0.0, self.max_y)
        } else {
            self.y.clamp(0.0, self.max_y)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paddle() -> Paddle {
        Paddle::new(Side::Left, &GameConfig::default(), 440.0)
    }

    #[test]
    fn placement_per_side() {
        let config = GameConfig::default();
        let left = Paddle::new(Side::Left, &config, 440.0);
        let right = Paddle::new(Side::Right, &config, 380.0);

        assert_eq!(left.x, 50.0);
        assert_eq!(right.x, 800.0 - 50.0 - 12.0);
        assert_eq!(left.y, 245.0);
        assert_eq!(left.facing_edge(), 62.0);
        assert_eq!(right.facing_edge(), right.x);
    }

    #[test]
    fn move_is_clamped_for_any_delta() {
        let config = GameConfig::default();
        let max_y = config.paddle_max_y();
        let starts = [0.0, 1.0, 245.0, 489.9, 490.0];
        let dts = [0.0001, 0.016, 0.25, 3.0, 100.0];

        for &start in &starts {
            for &dt in &dts {
                for dir in [MoveDirection::Up, MoveDirection::Down, MoveDirection::None] {
                    let mut p = paddle();
                    p.y = start;
                    p.move_by(dir, dt);
                    assert!(
                        (0.0..=max_y).contains(&p.y),
                        "y {} escaped bounds (start {}, dt {}, {:?})",
                        p.y,
                        start,
                        dt,
                        dir
                    );
                }
            }
        }
    }

    #[test]
    fn set_y_clamps_and_ignores_nan() {
        let mut p = paddle();
        p.set_y(-50.0);
        assert_eq!(p.y, 0.0);
        p.set_y(10_000.0);
        assert_eq!(p.y, 490.0);
        p.set_y(f32::NAN);
        assert_eq!(p.y, 490.0);
    }

    #[test]
    fn move_uses_speed_and_dt() {
        let mut p = paddle();
        p.move_by(MoveDirection::Down, 0.1);
        assert!((p.y - 289.0).abs() < 1e-4);
        p.move_by(MoveDirection::Up, 0.1);
        assert!((p.y - 245.0).abs() < 1e-4);
    }
}
