use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event};

use pong::{
    AiController, Authority, ConnectionState, DEFAULT_TICK_RATE, FixedTimestep, GameEvent,
    GameSession, MatchSnapshot, MoveDirection, NetworkStats, PendingEvent, Side,
};

use crate::demo::DemoMatch;
use crate::input::{Action, PaddleInput};
use crate::tui::{self, Tui, TuiState, View};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// What the front end drives: a playable session or the attract loop.
pub enum Scene {
    Session(GameSession),
    Demo(DemoMatch),
}

impl Scene {
    fn title(&self) -> &'static str {
        match self {
            Scene::Session(session) => match session.authority() {
                Authority::Local => "Pong - vs AI",
                Authority::Host(_) => "Pong - hosting",
                Authority::Client(_) => "Pong - joined",
            },
            Scene::Demo(_) => "Pong - demo",
        }
    }

    fn tick(&mut self, dt: f32, local: MoveDirection) {
        match self {
            Scene::Session(session) => session.tick(dt, local),
            Scene::Demo(demo) => demo.tick(dt),
        }
    }

    fn drain_events(&mut self) -> Vec<PendingEvent> {
        match self {
            Scene::Session(session) => session.drain_events(),
            Scene::Demo(demo) => demo.drain_events(),
        }
    }

    fn snapshot(&self) -> MatchSnapshot {
        match self {
            Scene::Session(session) => session.snapshot(),
            Scene::Demo(demo) => demo.snapshot(),
        }
    }

    fn status(&self) -> String {
        match self {
            Scene::Session(session) => session.status(),
            Scene::Demo(demo) => demo.status(),
        }
    }

    fn local_side(&self) -> Option<Side> {
        match self {
            Scene::Session(session) => Some(session.local_side()),
            Scene::Demo(_) => None,
        }
    }

    fn connection_state(&self) -> Option<ConnectionState> {
        match self {
            Scene::Session(session) => session.connection_state(),
            Scene::Demo(_) => None,
        }
    }

    fn network_stats(&self) -> Option<NetworkStats> {
        match self {
            Scene::Session(session) => session.network_stats(),
            Scene::Demo(_) => None,
        }
    }

    fn is_networked(&self) -> bool {
        self.connection_state().is_some()
    }

    fn is_over(&self) -> bool {
        match self {
            Scene::Session(session) => session.game().is_over(),
            Scene::Demo(_) => false,
        }
    }

    /// Direction an AI stand-in would give the local paddle.
    fn autopilot(&self, ai: &AiController) -> MoveDirection {
        match self {
            Scene::Session(session) => {
                let game = session.game();
                ai.decide(
                    game.ball().center_y(),
                    game.paddle(session.local_side()).center_y(),
                )
            }
            Scene::Demo(_) => MoveDirection::None,
        }
    }

    fn restart(&mut self) -> bool {
        match self {
            Scene::Session(session) => session.restart(),
            Scene::Demo(_) => false,
        }
    }

    fn close(&mut self) {
        if let Scene::Session(session) = self {
            session.close();
        }
    }
}

/// Tracks connection status between ticks so transitions are reported once.
struct LinkWatch {
    last: Option<ConnectionState>,
}

impl LinkWatch {
    fn new(scene: &Scene) -> Self {
        Self {
            last: scene.connection_state(),
        }
    }

    fn changed(&mut self, scene: &Scene) -> Option<ConnectionState> {
        let current = scene.connection_state();
        if current == self.last {
            return None;
        }
        self.last = current;
        current
    }
}

pub fn run_with_tui(mut scene: Scene, max_ticks: Option<u64>) -> Result<()> {
    let mut ui = Tui::new()?;
    let mut tui_state = TuiState::new();
    let mut input = PaddleInput::new(ui.release_events());
    let mut timestep = FixedTimestep::new(DEFAULT_TICK_RATE);
    let mut link = LinkWatch::new(&scene);
    let mut ticks = 0u64;

    tui_state.log_info(scene.status());

    let mut last_frame = Instant::now();
    'running: loop {
        let now = Instant::now();

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                match input.handle_key(key, now) {
                    Action::Quit => break 'running,
                    Action::Restart => {
                        if scene.restart() {
                            tui_state.log_info("match restarted");
                        } else {
                            tui_state.log_warn("restart is not available here");
                        }
                    }
                    Action::None => {}
                }
            }
        }

        let steps = timestep.advance(now.duration_since(last_frame).as_secs_f32());
        last_frame = now;
        let direction = input.direction(now);
        for _ in 0..steps {
            scene.tick(timestep.dt(), direction);
            ticks += 1;
        }

        tui_state.record_events(&scene.drain_events(), now);

        if let Some(state) = link.changed(&scene) {
            match state {
                ConnectionState::Lost => tui_state.log_error(state.describe()),
                ConnectionState::Closed => tui_state.log_warn(state.describe()),
                _ => tui_state.log_info(state.describe()),
            }
        }

        let snapshot = scene.snapshot();
        let status = scene.status();
        let view = View {
            title: scene.title(),
            snapshot: &snapshot,
            status: &status,
            stats: scene.network_stats(),
            local_side: scene.local_side(),
            now,
        };
        ui.terminal.draw(|frame| tui::render(frame, &tui_state, &view))?;

        if max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }

        let _ = event::poll(FRAME_INTERVAL)?;
    }

    scene.close();
    ui.restore_terminal()?;
    Ok(())
}

/// Runs without a terminal UI. The AI controller stands in for the local
/// player. Local and demo scenes run as fast as possible; networked scenes are
/// paced at the tick rate so the peer sees real-time play.
pub fn run_headless(mut scene: Scene, max_ticks: Option<u64>) -> Result<()> {
    let mut timestep = FixedTimestep::new(DEFAULT_TICK_RATE);
    let dt = timestep.dt();
    let mut link = LinkWatch::new(&scene);
    let autopilot = AiController::default();
    let paced = scene.is_networked();

    log::info!("{}", scene.status());

    let mut ticks = 0u64;
    let mut last_frame = Instant::now();
    loop {
        let steps = if paced {
            let now = Instant::now();
            let steps = timestep.advance(now.duration_since(last_frame).as_secs_f32());
            last_frame = now;
            steps
        } else {
            1
        };

        for _ in 0..steps {
            let direction = scene.autopilot(&autopilot);
            scene.tick(dt, direction);
            ticks += 1;
        }

        for pending in scene.drain_events() {
            log_event(&pending);
        }

        if let Some(state) = link.changed(&scene) {
            match state {
                ConnectionState::Lost => log::warn!("{}", state.describe()),
                _ => log::info!("{}", state.describe()),
            }
            if state.is_terminal() {
                break;
            }
        }

        if scene.is_over() {
            log::info!("{}", scene.status());
            break;
        }

        if max_ticks.is_some_and(|max| ticks >= max) {
            log::info!("stopping after {} ticks: {}", ticks, scene.status());
            break;
        }

        if paced {
            thread::sleep(Duration::from_secs_f32(dt / 2.0));
        }
    }

    if let Some(stats) = scene.network_stats() {
        log::info!(
            "network: {} sent, {} received, {} malformed, {} dropped",
            stats.messages_sent,
            stats.messages_received,
            stats.malformed,
            stats.dropped
        );
    }
    scene.close();
    Ok(())
}

fn log_event(pending: &PendingEvent) {
    match pending.event {
        GameEvent::Score { side, .. } => {
            log::info!("{} scores at tick {}", side.as_str(), pending.tick)
        }
        GameEvent::Win { side, .. } => log::info!("{} wins the match", side.as_str()),
        GameEvent::PaddleHit { side, .. } => {
            log::debug!("{} paddle hit at tick {}", side.as_str(), pending.tick)
        }
        GameEvent::WallBounce { .. } => log::debug!("wall bounce at tick {}", pending.tick),
    }
}
