use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::LobbyError;

use super::code::normalize_code;

/// How long a registered lobby code stays resolvable.
pub const CODE_TTL: Duration = Duration::from_secs(300);
/// How long an unanswered public-queue entry stays eligible.
pub const QUEUE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Client,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Client => "client",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Queued,
    Matched { role: Role, peer: SocketAddr },
}

#[derive(Debug, Clone)]
struct CodeEntry {
    addr: SocketAddr,
    owner: String,
    registered_at: Instant,
}

#[derive(Debug, Clone)]
struct QueueEntry {
    session_id: String,
    addr: SocketAddr,
    joined_at: Instant,
}

/// In-process store of lobby codes, the public queue and pairings the queued
/// side has not picked up yet.
#[derive(Debug, Default)]
pub struct Registry {
    codes: HashMap<String, CodeEntry>,
    queue: VecDeque<QueueEntry>,
    pairings: HashMap<String, SocketAddr>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `code` for `addr`, replacing any earlier registration of the
    /// same code. Returns the normalised code.
    pub fn register_code(
        &mut self,
        code: &str,
        addr: SocketAddr,
        owner: &str,
        now: Instant,
    ) -> Result<String, LobbyError> {
        let code = normalize_code(code)?;
        self.prune_codes(now);
        self.codes.insert(
            code.clone(),
            CodeEntry {
                addr,
                owner: owner.to_owned(),
                registered_at: now,
            },
        );
        Ok(code)
    }

    pub fn resolve_code(&self, code: &str, now: Instant) -> Result<SocketAddr, LobbyError> {
        let code = normalize_code(code)?;
        match self.codes.get(&code) {
            Some(entry) if now.saturating_duration_since(entry.registered_at) < CODE_TTL => {
                Ok(entry.addr)
            }
            _ => Err(LobbyError::CodeNotFound),
        }
    }

    /// One queue poll for `session_id`. A waiting peer is paired immediately
    /// and this caller becomes the client; otherwise the caller waits in the
    /// queue and becomes host once somebody picks it.
    pub fn join_queue(&mut self, session_id: &str, addr: SocketAddr, now: Instant) -> QueueStatus {
        if let Some(peer) = self.pairings.remove(session_id) {
            return QueueStatus::Matched {
                role: Role::Host,
                peer,
            };
        }

        self.prune_queue(now);

        if let Some(idx) = self.queue.iter().position(|e| e.session_id != session_id) {
            if let Some(waiting) = self.queue.remove(idx) {
                self.queue.retain(|e| e.session_id != session_id);
                self.pairings.insert(waiting.session_id, addr);
                return QueueStatus::Matched {
                    role: Role::Client,
                    peer: waiting.addr,
                };
            }
        }

        match self.queue.iter_mut().find(|e| e.session_id == session_id) {
            Some(entry) => {
                entry.addr = addr;
                entry.joined_at = now;
            }
            None => self.queue.push_back(QueueEntry {
                session_id: session_id.to_owned(),
                addr,
                joined_at: now,
            }),
        }
        QueueStatus::Queued
    }

    /// Forgets everything `session_id` left behind.
    pub fn cancel(&mut self, session_id: &str) {
        self.queue.retain(|e| e.session_id != session_id);
        self.pairings.remove(session_id);
        self.codes.retain(|_, e| e.owner != session_id);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn code_count(&self) -> usize {
        self.codes.len()
    }

    fn prune_codes(&mut self, now: Instant) {
        self.codes
            .retain(|_, e| now.saturating_duration_since(e.registered_at) < CODE_TTL);
    }

    fn prune_queue(&mut self, now: Instant) {
        self.queue
            .retain(|e| now.saturating_duration_since(e.joined_at) < QUEUE_TTL);
    }
}
