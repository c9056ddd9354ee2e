use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Listening,
    Connecting,
    Connected,
    /// Shut down locally.
    Closed,
    /// Peer went away or the socket failed.
    Lost,
}

impl ConnectionState {
    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Idle => 0,
            ConnectionState::Listening => 1,
            ConnectionState::Connecting => 2,
            ConnectionState::Connected => 3,
            ConnectionState::Closed => 4,
            ConnectionState::Lost => 5,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Listening,
            2 => ConnectionState::Connecting,
            3 => ConnectionState::Connected,
            4 => ConnectionState::Closed,
            5 => ConnectionState::Lost,
            _ => ConnectionState::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Lost)
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    pub fn describe(self) -> &'static str {
        match self {
            ConnectionState::Idle => "not connected",
            ConnectionState::Listening => "waiting for opponent",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "disconnected",
            ConnectionState::Lost => "connection lost",
        }
    }
}

/// Connection status shared between the tick loop and a background socket
/// thread. Once `Closed` or `Lost` is reached the status never changes again.
#[derive(Debug, Clone)]
pub struct LinkStatus(Arc<AtomicU8>);

impl LinkStatus {
    pub fn new(initial: ConnectionState) -> Self {
        Self(Arc::new(AtomicU8::new(initial.to_u8())))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `next` unless a terminal state was already reached. Returns
    /// whether the transition happened.
    pub fn set(&self, next: ConnectionState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if ConnectionState::from_u8(current).is_terminal() {
                    None
                } else {
                    Some(next.to_u8())
                }
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_sticky() {
        let status = LinkStatus::new(ConnectionState::Listening);
        assert!(status.set(ConnectionState::Connected));
        assert!(status.set(ConnectionState::Lost));
        assert!(!status.set(ConnectionState::Connected));
        assert!(!status.set(ConnectionState::Closed));
        assert_eq!(status.get(), ConnectionState::Lost);
    }

    #[test]
    fn clones_share_state() {
        let status = LinkStatus::new(ConnectionState::Connecting);
        let other = status.clone();
        other.set(ConnectionState::Connected);
        assert!(status.get().is_connected());
        assert_eq!(status.get().describe(), "connected");
    }
}
