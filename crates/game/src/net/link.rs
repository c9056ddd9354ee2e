use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use super::connection::{ConnectionState, LinkStatus};
use super::framing::LineReassembler;
use super::protocol::WireMessage;
use super::stats::{NetworkStats, SharedStats};

const READ_BUFFER_SIZE: usize = 4096;

/// Single-slot mailbox between a receive thread and the tick loop. Each
/// delivery overwrites whatever the tick loop has not taken yet, so a take
/// always yields the newest message.
#[derive(Debug, Clone, Default)]
pub(crate) struct Inbox {
    slot: Arc<Mutex<Option<WireMessage>>>,
}

impl Inbox {
    fn lock(&self) -> MutexGuard<'_, Option<WireMessage>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `message`. Returns true when it superseded an untaken one.
    pub fn put(&self, message: WireMessage) -> bool {
        self.lock().replace(message).is_some()
    }

    pub fn take(&self) -> Option<WireMessage> {
        self.lock().take()
    }
}

/// Tick-side half of a peer link: the write socket, the inbox fed by the
/// receive thread and the shared status.
pub(crate) struct LinkHandle {
    pub status: LinkStatus,
    pub stats: SharedStats,
    running: Arc<AtomicBool>,
    inbox: Inbox,
    writer: Option<TcpStream>,
    /// Delivers the write socket once a host has accepted its client.
    pending_writer: Option<Receiver<TcpStream>>,
    thread: Option<JoinHandle<()>>,
}

impl LinkHandle {
    pub fn new(
        status: LinkStatus,
        stats: SharedStats,
        running: Arc<AtomicBool>,
        inbox: Inbox,
    ) -> Self {
        Self {
            status,
            stats,
            running,
            inbox,
            writer: None,
            pending_writer: None,
            thread: None,
        }
    }

    pub fn with_writer(mut self, writer: TcpStream) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_pending_writer(mut self, pending: Receiver<TcpStream>) -> Self {
        self.pending_writer = Some(pending);
        self
    }

    pub fn with_thread(mut self, thread: JoinHandle<()>) -> Self {
        self.thread = Some(thread);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.status.get()
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats.snapshot()
    }

    fn writer(&mut self) -> Option<&mut TcpStream> {
        if self.writer.is_none() {
            if let Some(pending) = &self.pending_writer {
                if let Ok(stream) = pending.try_recv() {
                    self.writer = Some(stream);
                    self.pending_writer = None;
                }
            }
        }
        self.writer.as_mut()
    }

    /// Fire-and-forget send. A failed or timed-out write marks the link lost;
    /// a partial line cannot be recovered on a stream.
    pub fn send(&mut self, message: &WireMessage) -> bool {
        if !self.status.get().is_connected() {
            return false;
        }

        let line = match message.encode() {
            Ok(line) => line,
            Err(e) => {
                log::warn!("failed to encode {} message: {}", message.kind(), e);
                return false;
            }
        };

        let Some(writer) = self.writer() else {
            return false;
        };

        match writer.write_all(line.as_bytes()) {
            Ok(()) => {
                self.stats.record_sent(line.len());
                true
            }
            Err(e) => {
                if self.status.set(ConnectionState::Lost) {
                    log::warn!("send failed, link lost: {}", e);
                }
                false
            }
        }
    }

    /// Newest message received since the last call.
    pub fn take_newest(&self) -> Option<WireMessage> {
        self.inbox.take()
    }

    pub fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if self.status.set(ConnectionState::Closed) {
            log::info!("link closed");
        }
        self.writer();
        if let Some(writer) = self.writer.take() {
            let _ = writer.shutdown(Shutdown::Both);
        }
        self.pending_writer = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for LinkHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Background side of a link: owns the read socket and its reassembly buffer.
pub(crate) struct ReceiveLoop {
    pub stream: TcpStream,
    pub inbox: Inbox,
    pub status: LinkStatus,
    pub stats: SharedStats,
    pub running: Arc<AtomicBool>,
    /// Which message kind this role accepts; anything else is discarded.
    pub accepts: fn(&WireMessage) -> bool,
}

impl ReceiveLoop {
    /// Reads until the peer disconnects, the socket fails or `running` is
    /// cleared. Read timeouts only re-check the flag.
    pub fn run(mut self) {
        let mut reassembler = LineReassembler::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        while self.running.load(Ordering::SeqCst) {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    if self.running.load(Ordering::SeqCst) && self.status.set(ConnectionState::Lost) {
                        log::warn!("peer closed the connection");
                    }
                    break;
                }
                Ok(n) => {
                    self.stats.record_bytes_received(n);
                    for line in reassembler.push(&buf[..n]) {
                        self.deliver(&line);
                    }
                }
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    if self.running.load(Ordering::SeqCst) && self.status.set(ConnectionState::Lost) {
                        log::warn!("receive failed, link lost: {}", e);
                    }
                    break;
                }
            }
        }
    }

    fn deliver(&self, line: &str) {
        let message = match WireMessage::decode(line) {
            Some(message) if (self.accepts)(&message) => message,
            Some(message) => {
                log::debug!("ignoring {} message from peer", message.kind());
                self.stats.record_malformed();
                return;
            }
            None => {
                log::debug!("discarding malformed line ({} bytes)", line.len());
                self.stats.record_malformed();
                return;
            }
        };

        self.stats.record_message();
        if self.inbox.put(message) {
            self.stats.record_dropped();
        }
    }
}
