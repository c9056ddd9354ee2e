use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::LobbyError;

use super::code::generate_session_id;
use super::registry::{QueueStatus, Registry, Role};

/// Lower bound on how often a session may poll the public queue.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Where lobby codes and the public queue live. `now` drives expiry for
/// in-process registries; remote backends go by the service's own clock.
pub trait LobbyBackend: fmt::Debug + Send + Sync {
    fn register_code(
        &self,
        code: &str,
        addr: SocketAddr,
        owner: &str,
        now: Instant,
    ) -> Result<String, LobbyError>;

    fn resolve_code(&self, code: &str, now: Instant) -> Result<SocketAddr, LobbyError>;

    fn join_queue(
        &self,
        session_id: &str,
        addr: SocketAddr,
        now: Instant,
    ) -> Result<QueueStatus, LobbyError>;

    fn cancel(&self, session_id: &str) -> Result<(), LobbyError>;
}

/// Cloneable handle to one shared [`Registry`].
#[derive(Debug, Clone, Default)]
pub struct Matchmaker {
    registry: Arc<Mutex<Registry>>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // Every registry mutation is a single collection operation, so a
        // poisoned lock still guards consistent data.
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register_code(
        &self,
        code: &str,
        addr: SocketAddr,
        owner: &str,
        now: Instant,
    ) -> Result<String, LobbyError> {
        self.lock().register_code(code, addr, owner, now)
    }

    pub fn resolve_code(&self, code: &str, now: Instant) -> Result<SocketAddr, LobbyError> {
        self.lock().resolve_code(code, now)
    }

    pub fn join_queue(&self, session_id: &str, addr: SocketAddr, now: Instant) -> QueueStatus {
        self.lock().join_queue(session_id, addr, now)
    }

    pub fn cancel(&self, session_id: &str) {
        self.lock().cancel(session_id);
    }

    pub fn queue_len(&self) -> usize {
        self.lock().queue_len()
    }
}

impl LobbyBackend for Matchmaker {
    fn register_code(
        &self,
        code: &str,
        addr: SocketAddr,
        owner: &str,
        now: Instant,
    ) -> Result<String, LobbyError> {
        Matchmaker::register_code(self, code, addr, owner, now)
    }

    fn resolve_code(&self, code: &str, now: Instant) -> Result<SocketAddr, LobbyError> {
        Matchmaker::resolve_code(self, code, now)
    }

    fn join_queue(
        &self,
        session_id: &str,
        addr: SocketAddr,
        now: Instant,
    ) -> Result<QueueStatus, LobbyError> {
        Ok(Matchmaker::join_queue(self, session_id, addr, now))
    }

    fn cancel(&self, session_id: &str) -> Result<(), LobbyError> {
        Matchmaker::cancel(self, session_id);
        Ok(())
    }
}

/// One peer's view of matchmaking: its session id, the address it advertises
/// and its poll pacing.
#[derive(Debug)]
pub struct MatchmakingClient {
    backend: Arc<dyn LobbyBackend>,
    session_id: String,
    local_addr: SocketAddr,
    poll_interval: Duration,
    last_poll: Option<Instant>,
}

impl MatchmakingClient {
    pub fn new(backend: impl LobbyBackend + 'static, local_addr: SocketAddr) -> Self {
        Self {
            backend: Arc::new(backend),
            session_id: generate_session_id(),
            local_addr,
            poll_interval: MIN_POLL_INTERVAL,
            last_poll: None,
        }
    }

    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn register_code(&self, code: &str) -> Result<String, LobbyError> {
        let code =
            self.backend
                .register_code(code, self.local_addr, &self.session_id, Instant::now())?;
        log::info!("registered lobby code {}", code);
        Ok(code)
    }

    pub fn resolve_code(&self, code: &str) -> Result<SocketAddr, LobbyError> {
        self.backend.resolve_code(code, Instant::now())
    }

    pub fn join_public_queue(&mut self) -> Result<QueueStatus, LobbyError> {
        self.join_public_queue_at(Instant::now())
    }

    pub fn join_public_queue_at(&mut self, now: Instant) -> Result<QueueStatus, LobbyError> {
        self.last_poll = Some(now);
        let status = self.backend.join_queue(&self.session_id, self.local_addr, now)?;
        match status {
            QueueStatus::Queued => log::debug!("session {} waiting in queue", self.session_id),
            QueueStatus::Matched { role, peer } => {
                log::info!("matched with {} as {}", peer, role.as_str())
            }
        }
        Ok(status)
    }

    /// Paced queue poll. Returns `None` when called sooner than the poll
    /// interval after the previous poll.
    pub fn poll_queue(&mut self) -> Result<Option<QueueStatus>, LobbyError> {
        self.poll_queue_at(Instant::now())
    }

    pub fn poll_queue_at(&mut self, now: Instant) -> Result<Option<QueueStatus>, LobbyError> {
        if let Some(last) = self.last_poll {
            if now.saturating_duration_since(last) < self.poll_interval {
                return Ok(None);
            }
        }
        self.join_public_queue_at(now).map(Some)
    }

    /// Joins the public queue and keeps polling at the pacing interval until
    /// paired. Blocks the calling thread; `Ok(None)` means nobody turned up
    /// within `limit`.
    pub fn wait_for_match(
        &mut self,
        limit: Duration,
    ) -> Result<Option<(Role, SocketAddr)>, LobbyError> {
        let deadline = Instant::now() + limit;
        let mut status = self.join_public_queue()?;
        loop {
            if let QueueStatus::Matched { role, peer } = status {
                return Ok(Some((role, peer)));
            }
            let next = self.last_poll.unwrap_or_else(Instant::now) + self.poll_interval;
            if next > deadline {
                self.cancel();
                return Ok(None);
            }
            thread::sleep(next.saturating_duration_since(Instant::now()));
            status = self.join_public_queue()?;
        }
    }

    /// Withdraws from the queue and drops any code this session registered.
    pub fn cancel(&mut self) {
        self.withdraw();
        self.last_poll = None;
    }

    fn withdraw(&self) {
        if let Err(e) = self.backend.cancel(&self.session_id) {
            log::warn!("could not withdraw session {}: {}", self.session_id, e);
        }
    }
}

impl Drop for MatchmakingClient {
    fn drop(&mut self) {
        self.withdraw();
    }
}
