use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Counters {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    malformed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of the link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Lines that failed to decode or arrived from the wrong role.
    pub malformed: u64,
    /// Decoded messages overwritten by a newer one before the tick loop took them.
    pub dropped: u64,
}

/// Counters shared between a link's tick-side handle and its receive thread.
#[derive(Debug, Clone, Default)]
pub struct SharedStats(Arc<Counters>);

impl SharedStats {
    pub fn record_sent(&self, bytes: usize) {
        self.0.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.0.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_bytes_received(&self, bytes: usize) {
        self.0.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_message(&self) {
        self.0.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.0.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.0.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> NetworkStats {
        NetworkStats {
            messages_sent: self.0.messages_sent.load(Ordering::Relaxed),
            messages_received: self.0.messages_received.load(Ordering::Relaxed),
            bytes_sent: self.0.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.0.bytes_received.load(Ordering::Relaxed),
            malformed: self.0.malformed.load(Ordering::Relaxed),
            dropped: self.0.dropped.load(Ordering::Relaxed),
        }
    }
}
