use rand::SeedableRng;
use rand::rngs::StdRng;

use pong::{DemoAi, EventQueue, Match, MatchConfig, MatchSnapshot, MoveDirection, PendingEvent, Side};

/// Pause on the final score before the attract loop serves again.
const RESTART_DELAY: f32 = 2.0;
const EVENT_CAPACITY: usize = 64;

/// Attract mode: both paddles are driven by the noisy demo controllers and
/// the match restarts by itself after a win.
pub struct DemoMatch {
    game: Match,
    left: DemoAi,
    right: DemoAi,
    rng: StdRng,
    events: EventQueue,
    restart_in: Option<f32>,
}

impl DemoMatch {
    pub fn new(config: MatchConfig) -> Self {
        Self::with_parts(Match::new(config), StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(config: MatchConfig, seed: u64) -> Self {
        Self::with_parts(Match::with_seed(config, seed), StdRng::seed_from_u64(seed))
    }

    fn with_parts(mut game: Match, rng: StdRng) -> Self {
        let speed = game.config().game.paddle_speed;
        game.set_paddle_speed(Side::Right, speed);
        game.start();

        Self {
            game,
            left: DemoAi::for_side(Side::Left),
            right: DemoAi::for_side(Side::Right),
            rng,
            events: EventQueue::new(EVENT_CAPACITY),
            restart_in: None,
        }
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    pub fn tick(&mut self, dt: f32) {
        if self.game.is_over() {
            let remaining = self.restart_in.get_or_insert(RESTART_DELAY);
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.restart_in = None;
                self.game.restart();
            }
            return;
        }

        let height = self.game.config().game.screen_height;
        for (side, ai) in [(Side::Left, &self.left), (Side::Right, &self.right)] {
            let paddle = self.game.paddle(side);
            let step = ai.step(self.game.ball(), paddle, height, dt, &mut self.rng);
            let y = paddle.y + step;
            self.game.set_paddle_y(side, y);
        }

        let events = self.game.tick(dt, MoveDirection::None, MoveDirection::None);
        let tick = self.game.tick_count();
        self.events.extend(tick, events);
    }

    pub fn drain_events(&mut self) -> Vec<PendingEvent> {
        self.events.drain()
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        self.game.snapshot()
    }

    pub fn status(&self) -> String {
        match self.game.winner() {
            Some(winner) => format!("demo: {} side wins, next match soon", winner.as_str()),
            None => "demo: attract mode".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pong::{GameEvent, MatchPhase};

    use super::*;

    #[test]
    fn demo_rallies_and_produces_events() {
        let mut demo = DemoMatch::with_seed(MatchConfig::default(), 3);
        let mut events = Vec::new();

        for _ in 0..1200 {
            demo.tick(1.0 / 60.0);
            events.extend(demo.drain_events());
        }

        assert!(
            events
                .iter()
                .any(|e| matches!(e.event, GameEvent::PaddleHit { .. } | GameEvent::WallBounce { .. }))
        );
    }

    #[test]
    fn demo_restarts_after_win() {
        let mut demo = DemoMatch::with_seed(MatchConfig::default(), 4);
        let win_score = demo.game().config().game.win_score;

        let mut saw_game_over = false;
        for _ in 0..(60 * 60 * 20) {
            demo.tick(1.0 / 60.0);
            demo.drain_events();
            if demo.game().is_over() {
                saw_game_over = true;
                assert!(demo.status().contains("wins"));
                let scores = demo.game().scores();
                assert!(scores.left == win_score || scores.right == win_score);
            } else if saw_game_over {
                break;
            }
        }

        if saw_game_over {
            assert_eq!(demo.game().phase(), MatchPhase::Playing);
            assert_eq!(demo.game().scores().left + demo.game().scores().right, 0);
        }
    }
}
