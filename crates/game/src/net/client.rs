use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;

use crate::config::NetConfig;
use crate::error::NetError;

use super::connection::{ConnectionState, LinkStatus};
use super::host::prepare_stream;
use super::link::{Inbox, LinkHandle, ReceiveLoop};
use super::protocol::{StateUpdate, WireMessage};
use super::stats::{NetworkStats, SharedStats};

/// Mirror side of a LAN match. Sends only its own paddle and keeps the newest
/// host state.
pub struct NetworkClient {
    peer: SocketAddr,
    link: LinkHandle,
    latest: Option<StateUpdate>,
}

impl NetworkClient {
    pub fn connect(addr: SocketAddr, config: &NetConfig) -> Result<Self, NetError> {
        let status = LinkStatus::new(ConnectionState::Connecting);
        log::info!("connecting to {}", addr);

        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout)
            .map_err(|source| NetError::Connect { addr, source })?;
        let writer = prepare_stream(&stream, config)?;

        let stats = SharedStats::default();
        let running = Arc::new(AtomicBool::new(true));
        let inbox = Inbox::default();
        status.set(ConnectionState::Connected);

        let receive = ReceiveLoop {
            stream,
            inbox: inbox.clone(),
            status: status.clone(),
            stats: stats.clone(),
            running: Arc::clone(&running),
            accepts: |message| matches!(message, WireMessage::StateUpdate(_)),
        };
        let thread = thread::Builder::new()
            .name("pong-client".into())
            .spawn(move || receive.run())?;

        log::info!("connected to {}", addr);

        let link = LinkHandle::new(status, stats, running, inbox)
            .with_writer(writer)
            .with_thread(thread);

        Ok(Self {
            peer: addr,
            link,
            latest: None,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn stats(&self) -> NetworkStats {
        self.link.stats()
    }

    pub fn send_paddle(&mut self, y: f32) -> bool {
        self.link.send(&WireMessage::paddle(y))
    }

    /// Newest host state received since the last poll.
    pub fn poll_state(&mut self) -> Option<StateUpdate> {
        let state = match self.link.take_newest()? {
            WireMessage::StateUpdate(state) => state,
            WireMessage::PaddleUpdate { .. } => return None,
        };
        self.latest = Some(state);
        Some(state)
    }

    /// Last mirrored host state, if any arrived.
    pub fn latest_state(&self) -> Option<StateUpdate> {
        self.latest
    }

    pub fn close(&mut self) {
        self.link.close();
    }
}
