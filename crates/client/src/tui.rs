use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::time::Instant;

use crossterm::event::{
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Points, Rectangle};
use ratatui::widgets::{Block, Borders, Paragraph};

use pong::{GameEvent, MatchPhase, MatchSnapshot, NetworkStats, PendingEvent, Side};

const MAX_LOG_LINES: usize = 200;

/// Owns the terminal for the lifetime of the UI and restores it on drop.
pub struct Tui {
    pub terminal: Terminal<CrosstermBackend<Stdout>>,
    release_events: bool,
}

impl Tui {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

        let release_events = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if release_events {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            release_events,
        })
    }

    /// Whether key releases are reported, so holds need no inference.
    pub fn release_events(&self) -> bool {
        self.release_events
    }

    pub fn restore_terminal(&mut self) -> io::Result<()> {
        if self.release_events {
            execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
            self.release_events = false;
        }
        terminal::disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            cursor::Show
        )?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn color(self) -> Color {
        match self {
            LogLevel::Info => Color::White,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct ActiveShake {
    started: Instant,
    duration: f32,
    intensity: f32,
}

/// Presentation state that outlives a single frame: the log panel and the
/// running screen shake.
pub struct TuiState {
    logs: VecDeque<LogEntry>,
    shake: Option<ActiveShake>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            logs: VecDeque::with_capacity(MAX_LOG_LINES),
            shake: None,
        }
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.logs.len() >= MAX_LOG_LINES {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            level,
            message: message.into(),
        });
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn logs(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.logs.iter()
    }

    /// Scores and wins go to the log panel; hits and scores shake the arena.
    pub fn record_events(&mut self, events: &[PendingEvent], now: Instant) {
        for pending in events {
            match pending.event {
                GameEvent::Score { side, .. } => {
                    self.log_info(format!("{} scores (tick {})", side.as_str(), pending.tick));
                }
                GameEvent::Win { side, .. } => {
                    self.log_info(format!("{} wins the match", side.as_str()));
                }
                GameEvent::PaddleHit { .. } | GameEvent::WallBounce { .. } => {}
            }

            if let Some(shake) = pending.event.shake() {
                self.shake = Some(ActiveShake {
                    started: now,
                    duration: shake.duration,
                    intensity: shake.intensity,
                });
            }
        }
    }

    /// Field-space offset of the arena for the running shake, decaying to
    /// zero over its duration.
    pub fn shake_offset(&self, now: Instant) -> (f64, f64) {
        let Some(shake) = self.shake else {
            return (0.0, 0.0);
        };

        let elapsed = now.saturating_duration_since(shake.started).as_secs_f32();
        if elapsed >= shake.duration || shake.duration <= 0.0 {
            return (0.0, 0.0);
        }

        let falloff = 1.0 - elapsed / shake.duration;
        let amplitude = f64::from(shake.intensity * falloff);
        let phase = f64::from(elapsed) * 60.0;
        (amplitude * phase.sin(), amplitude * (phase * 1.3).cos())
    }
}

/// Everything a frame draws besides the persistent state.
pub struct View<'a> {
    pub title: &'a str,
    pub snapshot: &'a MatchSnapshot,
    pub status: &'a str,
    pub stats: Option<NetworkStats>,
    pub local_side: Option<Side>,
    pub now: Instant,
}

pub fn render(frame: &mut Frame, state: &TuiState, view: &View) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(34)])
        .split(frame.area());

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(columns[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(columns[1]);

    render_header(frame, main[0], view);
    render_arena(frame, main[1], state, view);
    render_status(frame, main[2], view);
    render_network(frame, side[0], view.stats);
    render_log(frame, side[1], state);
}

fn render_header(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default()
        .title(format!(" {} ", view.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let scores = view.snapshot.scores;
    let label = |side: Side| match view.local_side {
        Some(local) if local == side => "YOU",
        Some(_) => "THEM",
        None => side.as_str(),
    };

    let line = Line::from(vec![
        Span::styled(label(Side::Left), Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(
            format!("{}  :  {}", scores.left, scores.right),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(label(Side::Right), Style::default().fg(Color::Gray)),
    ]);

    let paragraph = Paragraph::new(line)
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Field y grows downward, canvas y grows upward.
fn flip(field_height: f64, y: f64, height: f64) -> f64 {
    field_height - y - height
}

fn render_arena(frame: &mut Frame, area: Rect, state: &TuiState, view: &View) {
    let snapshot = view.snapshot;
    let width = f64::from(snapshot.field.x);
    let height = f64::from(snapshot.field.y);
    let (dx, dy) = state.shake_offset(view.now);

    let border = match snapshot.phase {
        MatchPhase::Playing => Color::Green,
        MatchPhase::Menu => Color::DarkGray,
        MatchPhase::GameOver => Color::Magenta,
    };

    let center_line: Vec<(f64, f64)> = (0u32..)
        .map(|i| f64::from(i) * 20.0)
        .take_while(|y| *y <= height)
        .map(|y| (width / 2.0, y))
        .collect();

    let trail: Vec<(f64, f64)> = snapshot
        .trail
        .iter()
        .map(|p| {
            let size = f64::from(snapshot.ball_size);
            (
                f64::from(p.x) + size / 2.0,
                flip(height, f64::from(p.y), size) + size / 2.0,
            )
        })
        .collect();

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .marker(Marker::Braille)
        .x_bounds([dx, width + dx])
        .y_bounds([dy, height + dy])
        .paint(move |ctx| {
            ctx.draw(&Points {
                coords: &center_line,
                color: Color::DarkGray,
            });
            ctx.draw(&Points {
                coords: &trail,
                color: Color::DarkGray,
            });

            for side in [Side::Left, Side::Right] {
                let rect = snapshot.paddle(side);
                ctx.draw(&Rectangle {
                    x: f64::from(rect.x),
                    y: flip(height, f64::from(rect.y), f64::from(rect.h)),
                    width: f64::from(rect.w),
                    height: f64::from(rect.h),
                    color: Color::White,
                });
            }

            let ball = snapshot.ball_rect();
            ctx.draw(&Rectangle {
                x: f64::from(ball.x),
                y: flip(height, f64::from(ball.y), f64::from(ball.h)),
                width: f64::from(ball.w),
                height: f64::from(ball.h),
                color: Color::Yellow,
            });
        });

    frame.render_widget(canvas, area);
}

fn render_status(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let line = Line::from(vec![
        Span::styled(view.status, Style::default().fg(Color::White)),
        Span::styled(
            "   W/S or arrows move, r restart, q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_network(frame: &mut Frame, area: Rect, stats: Option<NetworkStats>) {
    let block = Block::default()
        .title(" Network ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let Some(net) = stats else {
        let paragraph = Paragraph::new("offline").block(block).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    };

    let row = |name: &'static str, value: String, color: Color| {
        Line::from(vec![
            Span::styled(name, Style::default().fg(Color::Gray)),
            Span::styled(value, Style::default().fg(color)),
        ])
    };

    let lines = vec![
        row(
            "Messages: ",
            format!("{} sent / {} recv", net.messages_sent, net.messages_received),
            Color::White,
        ),
        row(
            "Bytes: ",
            format!(
                "{} / {}",
                format_bytes(net.bytes_sent),
                format_bytes(net.bytes_received)
            ),
            Color::White,
        ),
        row(
            "Malformed: ",
            net.malformed.to_string(),
            if net.malformed > 0 { Color::Yellow } else { Color::White },
        ),
        row(
            "Dropped: ",
            net.dropped.to_string(),
            if net.dropped > 0 { Color::Yellow } else { Color::White },
        ),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let visible = area.height.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = state
        .logs()
        .rev()
        .take(visible)
        .map(|entry| {
            Line::from(Span::styled(
                entry.message.as_str(),
                Style::default().fg(entry.level.color()),
            ))
        })
        .collect();
    lines.reverse();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000 {
        format!("{:.2} MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.2} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use glam::Vec2;

    use super::*;

    #[test]
    fn log_panel_is_bounded() {
        let mut state = TuiState::new();
        for i in 0..(MAX_LOG_LINES + 10) {
            state.log_info(format!("line {}", i));
        }
        assert_eq!(state.logs().count(), MAX_LOG_LINES);
        assert_eq!(state.logs().next().map(|e| e.message.as_str()), Some("line 10"));
    }

    #[test]
    fn score_events_log_and_shake() {
        let mut state = TuiState::new();
        let now = Instant::now();
        let events = vec![
            PendingEvent {
                tick: 12,
                event: GameEvent::WallBounce {
                    position: Vec2::new(10.0, 0.0),
                },
            },
            PendingEvent {
                tick: 40,
                event: GameEvent::Score {
                    side: Side::Right,
                    position: Vec2::new(400.0, 300.0),
                },
            },
        ];

        state.record_events(&events, now);

        assert_eq!(state.logs().count(), 1);
        let (dx, dy) = state.shake_offset(now + Duration::from_millis(30));
        assert!(dx != 0.0 || dy != 0.0);
        assert!(dx.abs() <= 8.0 && dy.abs() <= 8.0);
        assert_eq!(state.shake_offset(now + Duration::from_millis(300)), (0.0, 0.0));
    }

    #[test]
    fn wall_bounce_does_not_shake() {
        let mut state = TuiState::new();
        let now = Instant::now();
        state.record_events(
            &[PendingEvent {
                tick: 1,
                event: GameEvent::WallBounce {
                    position: Vec2::ZERO,
                },
            }],
            now,
        );
        assert_eq!(state.shake_offset(now), (0.0, 0.0));
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2_500), "2.50 KB");
        assert_eq!(format_bytes(3_000_000), "3.00 MB");
    }
}
