use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::MatchConfig;
use crate::entity::{Ball, MoveDirection, Paddle, Side};
use crate::event::GameEvent;
use crate::net::StateUpdate;
use crate::physics::{Scoreboard, StepOutcome, step_ball};

use super::snapshot::MatchSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MatchPhase {
    #[default]
    Menu,
    Playing,
    GameOver,
}

impl MatchPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchPhase::Menu => "menu",
            MatchPhase::Playing => "playing",
            MatchPhase::GameOver => "gameover",
        }
    }
}

/// One match: both paddles, the ball, the scores and the phase machine.
///
/// The left paddle belongs to the local player (or the host in a LAN match),
/// the right one to the AI or the remote client.
pub struct Match {
    config: MatchConfig,
    phase: MatchPhase,
    left: Paddle,
    right: Paddle,
    ball: Ball,
    scores: Scoreboard,
    winner: Option<Side>,
    rng: StdRng,
    tick: u64,
}

impl Match {
    pub fn new(config: MatchConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic serves, for tests and reproducible headless runs.
    pub fn with_seed(config: MatchConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: MatchConfig, rng: StdRng) -> Self {
        let game = &config.game;
        let left = Paddle::new(Side::Left, game, game.paddle_speed);
        let right = Paddle::new(Side::Right, game, config.ai_speed);
        let ball = Ball::centered(game);

        Self {
            config,
            phase: MatchPhase::Menu,
            left,
            right,
            ball,
            scores: Scoreboard::default(),
            winner: None,
            rng,
            tick: 0,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == MatchPhase::GameOver
    }

    pub fn scores(&self) -> Scoreboard {
        self.scores
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn ball_mut(&mut self) -> &mut Ball {
        &mut self.ball
    }

    pub fn paddle(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn paddle_mut(&mut self, side: Side) -> &mut Paddle {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Human-controlled paddles move at player speed; the AI uses the
    /// difficulty's speed.
    pub fn set_paddle_speed(&mut self, side: Side, speed: f32) {
        self.paddle_mut(side).speed = speed.max(0.0);
    }

    /// Starts a fresh match. Also serves as restart from any phase.
    pub fn start(&mut self) {
        self.scores.reset();
        self.winner = None;
        self.left.reset();
        self.right.reset();
        self.tick = 0;

        let toward = if self.rng.gen_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        };
        self.serve(toward);
        self.phase = MatchPhase::Playing;
        log::debug!(
            "match started at {} difficulty",
            self.config.difficulty.as_str()
        );
    }

    pub fn restart(&mut self) {
        self.start();
    }

    pub fn return_to_menu(&mut self) {
        self.phase = MatchPhase::Menu;
    }

    fn serve(&mut self, toward: Side) {
        let base = self.config.ball_base_speed;
        self.ball.reset(toward, base, &self.config.game, &mut self.rng);
    }

    /// Moves one paddle by direction. No effect outside `Playing`.
    pub fn move_paddle(&mut self, side: Side, direction: MoveDirection, dt: f32) {
        if self.phase != MatchPhase::Playing || !valid_dt(dt) {
            return;
        }
        self.paddle_mut(side).move_by(direction, dt);
    }

    /// Absolute placement for pointer drags and network overrides. Clamped
    /// into the field and ignored once the match is over.
    pub fn set_paddle_y(&mut self, side: Side, y: f32) {
        if self.phase == MatchPhase::GameOver {
            return;
        }
        self.paddle_mut(side).set_y(y);
    }

    /// Advances the authoritative simulation by `dt` seconds.
    pub fn tick(
        &mut self,
        dt: f32,
        left_dir: MoveDirection,
        right_dir: MoveDirection,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.phase != MatchPhase::Playing || !valid_dt(dt) {
            return events;
        }

        self.left.move_by(left_dir, dt);
        self.right.move_by(right_dir, dt);

        let game = &self.config.game;
        match step_ball(&mut self.ball, &self.left, &self.right, game, dt) {
            StepOutcome::Open => {}
            StepOutcome::WallBounce => events.push(GameEvent::WallBounce {
                position: self.ball_center(),
            }),
            StepOutcome::PaddleHit(side) => events.push(GameEvent::PaddleHit {
                side,
                position: self.ball_center(),
            }),
            StepOutcome::Exit { scorer } => {
                let position = self.exit_point();
                self.scores.award(scorer);
                self.serve(scorer.opposite());
                events.push(GameEvent::Score {
                    side: scorer,
                    position,
                });
                self.check_win(position, &mut events);
            }
        }

        self.tick += 1;
        events
    }

    fn check_win(&mut self, position: Vec2, events: &mut Vec<GameEvent>) {
        if let Some(side) = self.scores.winner(self.config.game.win_score) {
            self.phase = MatchPhase::GameOver;
            self.winner = Some(side);
            events.push(GameEvent::Win { side, position });
            log::info!(
                "{} side wins {}-{}",
                side.as_str(),
                self.scores.left,
                self.scores.right
            );
        }
    }

    fn ball_center(&self) -> Vec2 {
        self.ball.pos + Vec2::splat(self.ball.size / 2.0)
    }

    /// Point on the field edge where the ball left.
    fn exit_point(&self) -> Vec2 {
        let game = &self.config.game;
        let center = self.ball_center();
        Vec2::new(
            center.x.clamp(0.0, game.screen_width),
            center.y.clamp(0.0, game.screen_height),
        )
    }

    /// Authoritative state as seen by a LAN client.
    pub fn state_update(&self) -> StateUpdate {
        StateUpdate {
            paddle_y: self.left.y,
            ball_x: self.ball.pos.x,
            ball_y: self.ball.pos.y,
            ball_vx: self.ball.vel.x,
            ball_vy: self.ball.vel.y,
            score_p: self.scores.left,
            score_a: self.scores.right,
        }
    }

    /// Overwrites the mirror with host state. Runs no ball physics. Score
    /// increases produce `Score` events so the client can play effects, and a
    /// mirrored score reaching the win threshold ends the match. A finished
    /// mirror keeps taking positions and scores but holds its phase until the
    /// host's scores drop back below the threshold, which happens when the
    /// host restarts.
    pub fn apply_state(&mut self, state: &StateUpdate) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let win_score = self.config.game.win_score;

        let held = self.phase == MatchPhase::GameOver
            && (state.score_p >= win_score || state.score_a >= win_score);
        if self.phase == MatchPhase::GameOver && !held {
            self.winner = None;
            self.phase = MatchPhase::Playing;
        }

        self.left.set_y(state.paddle_y);
        self.ball.place(
            Vec2::new(state.ball_x, state.ball_y),
            Vec2::new(state.ball_vx, state.ball_vy),
        );

        let previous = self.scores;
        self.scores = Scoreboard {
            left: state.score_p,
            right: state.score_a,
        };
        if held {
            self.tick += 1;
            return events;
        }

        for (side, before, after) in [
            (Side::Left, previous.left, self.scores.left),
            (Side::Right, previous.right, self.scores.right),
        ] {
            if after > before {
                self.ball.clear_trail();
                events.push(GameEvent::Score {
                    side,
                    position: self.config.game.center(),
                });
            }
        }

        if !events.is_empty() {
            self.check_win(self.config.game.center(), &mut events);
        }

        self.tick += 1;
        events
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            phase: self.phase,
            tick: self.tick,
            ball_pos: self.ball.pos,
            ball_vel: self.ball.vel,
            ball_size: self.ball.size,
            trail: self.ball.trail().copied().collect(),
            left: self.left.rect(),
            right: self.right.rect(),
            scores: self.scores,
            winner: self.winner,
            field: Vec2::new(self.config.game.screen_width, self.config.game.screen_height),
        }
    }
}

fn valid_dt(dt: f32) -> bool {
    dt.is_finite() && dt > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;

    fn playing(seed: u64) -> Match {
        let mut game = Match::with_seed(MatchConfig::default(), seed);
        game.start();
        game
    }

    /// Puts the ball just past the given edge so the next tick scores.
    fn force_exit(game: &mut Match, past: Side) {
        let ball = game.ball_mut();
        match past {
            Side::Left => {
                ball.pos = Vec2::new(-20.0, 300.0);
                ball.vel = Vec2::new(-300.0, 0.0);
            }
            Side::Right => {
                ball.pos = Vec2::new(810.0, 300.0);
                ball.vel = Vec2::new(300.0, 0.0);
            }
        }
    }

    #[test]
    fn start_resets_everything() {
        let game = playing(1);

        assert_eq!(game.phase(), MatchPhase::Playing);
        assert_eq!(game.scores(), Scoreboard::default());
        assert_eq!(game.ball().pos, Vec2::new(400.0, 300.0));
        assert_eq!(game.ball().vel.x.abs(), 420.0);
        assert_eq!(game.paddle(Side::Left).y, 245.0);
        assert_eq!(game.paddle(Side::Right).speed, 380.0);
    }

    #[test]
    fn menu_phase_is_inert() {
        let mut game = Match::with_seed(MatchConfig::default(), 2);
        let before = game.ball().pos;

        let events = game.tick(0.016, MoveDirection::Down, MoveDirection::Up);
        game.move_paddle(Side::Left, MoveDirection::Down, 0.5);

        assert!(events.is_empty());
        assert_eq!(game.ball().pos, before);
        assert_eq!(game.paddle(Side::Left).y, 245.0);
    }

    #[test]
    fn score_resets_ball_toward_conceding_side() {
        let mut game = playing(3);
        for _ in 0..5 {
            game.tick(0.016, MoveDirection::None, MoveDirection::None);
        }
        force_exit(&mut game, Side::Left);

        let events = game.tick(0.016, MoveDirection::None, MoveDirection::None);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            GameEvent::Score {
                side: Side::Right,
                ..
            }
        ));
        assert_eq!(game.scores().right, 1);
        assert_eq!(game.ball().pos, Vec2::new(400.0, 300.0));
        assert_eq!(game.ball().trail_len(), 0);
        assert!(game.ball().vel.x < 0.0);

        force_exit(&mut game, Side::Right);
        game.tick(0.016, MoveDirection::None, MoveDirection::None);
        assert_eq!(game.scores().left, 1);
        assert!(game.ball().vel.x > 0.0);
    }

    #[test]
    fn win_is_terminal_until_restart() {
        let mut game = playing(4);
        let mut last = Vec::new();
        for _ in 0..7 {
            force_exit(&mut game, Side::Right);
            last = game.tick(0.016, MoveDirection::None, MoveDirection::None);
        }

        assert_eq!(game.phase(), MatchPhase::GameOver);
        assert_eq!(game.winner(), Some(Side::Left));
        assert!(matches!(last.last(), Some(GameEvent::Win { side: Side::Left, .. })));

        let ball = game.ball().pos;
        let paddle = game.paddle(Side::Left).y;
        for _ in 0..10 {
            assert!(game.tick(0.016, MoveDirection::Down, MoveDirection::Down).is_empty());
        }
        game.move_paddle(Side::Left, MoveDirection::Down, 0.1);
        game.set_paddle_y(Side::Left, 0.0);
        assert_eq!(game.ball().pos, ball);
        assert_eq!(game.paddle(Side::Left).y, paddle);
        assert_eq!(game.scores().left, 7);

        game.restart();
        assert_eq!(game.phase(), MatchPhase::Playing);
        assert_eq!(game.scores(), Scoreboard::default());
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn non_positive_dt_is_ignored() {
        let mut game = playing(5);
        let before = game.ball().pos;
        assert!(game.tick(0.0, MoveDirection::None, MoveDirection::None).is_empty());
        assert!(game.tick(-1.0, MoveDirection::None, MoveDirection::None).is_empty());
        assert!(game.tick(f32::NAN, MoveDirection::None, MoveDirection::None).is_empty());
        assert_eq!(game.ball().pos, before);
        assert_eq!(game.tick_count(), 0);
    }

    #[test]
    fn difficulty_sets_serve_speed() {
        let mut game = Match::with_seed(MatchConfig::with_difficulty(Difficulty::Hard), 6);
        game.start();
        assert_eq!(game.ball().vel.x.abs(), 480.0);
        assert!((game.ball().vel.y.abs() - 480.0 * 0.55).abs() < 1e-3);
    }

    #[test]
    fn state_round_trips_through_mirror() {
        let mut host = playing(7);
        for _ in 0..30 {
            host.tick(0.016, MoveDirection::Down, MoveDirection::None);
        }
        let state = host.state_update();

        let mut mirror = playing(8);
        let events = mirror.apply_state(&state);

        assert!(events.is_empty());
        assert_eq!(mirror.ball().pos, host.ball().pos);
        assert_eq!(mirror.ball().vel, host.ball().vel);
        assert_eq!(mirror.paddle(Side::Left).y, host.paddle(Side::Left).y);
    }

    #[test]
    fn mirror_reports_score_and_win() {
        let mut mirror = playing(9);
        let mut state = StateUpdate {
            paddle_y: 100.0,
            ball_x: 400.0,
            ball_y: 300.0,
            ball_vx: 420.0,
            ball_vy: 231.0,
            score_p: 0,
            score_a: 1,
        };

        let events = mirror.apply_state(&state);
        assert!(matches!(
            events.as_slice(),
            [GameEvent::Score {
                side: Side::Right,
                ..
            }]
        ));
        assert!(mirror.apply_state(&state).is_empty());

        state.score_p = 7;
        let events = mirror.apply_state(&state);
        assert_eq!(events.len(), 2);
        assert_eq!(mirror.phase(), MatchPhase::GameOver);
        assert_eq!(mirror.winner(), Some(Side::Left));

        state.score_p = 0;
        state.score_a = 0;
        mirror.apply_state(&state);
        assert_eq!(mirror.phase(), MatchPhase::Playing);
        assert_eq!(mirror.winner(), None);
    }

    #[test]
    fn finished_mirror_still_takes_positions() {
        let mut mirror = playing(10);
        let mut state = StateUpdate {
            paddle_y: 100.0,
            ball_x: 400.0,
            ball_y: 300.0,
            ball_vx: 420.0,
            ball_vy: 231.0,
            score_p: 7,
            score_a: 3,
        };
        assert_eq!(mirror.apply_state(&state).len(), 3);
        assert_eq!(mirror.phase(), MatchPhase::GameOver);

        state.paddle_y = 250.0;
        state.ball_x = 10.0;
        state.ball_y = 40.0;
        state.ball_vx = -300.0;
        assert!(mirror.apply_state(&state).is_empty());

        assert_eq!(mirror.phase(), MatchPhase::GameOver);
        assert_eq!(mirror.winner(), Some(Side::Left));
        assert_eq!(mirror.paddle(Side::Left).y, 250.0);
        assert_eq!(mirror.ball().pos, Vec2::new(10.0, 40.0));
        assert_eq!(mirror.ball().vel.x, -300.0);
        assert_eq!(mirror.scores().left, 7);
    }
}
