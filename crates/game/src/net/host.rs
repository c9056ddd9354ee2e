use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::thread;

use crate::config::NetConfig;
use crate::error::NetError;
use crate::lobby::generate_code;

use super::connection::{ConnectionState, LinkStatus};
use super::link::{Inbox, LinkHandle, ReceiveLoop};
use super::protocol::{StateUpdate, WireMessage};
use super::stats::{NetworkStats, SharedStats};

/// Authoritative side of a LAN match. Accepts exactly one client, then stops
/// listening.
pub struct NetworkHost {
    code: String,
    local_addr: SocketAddr,
    link: LinkHandle,
    remote_paddle_y: Option<f32>,
}

impl NetworkHost {
    pub fn start(config: &NetConfig) -> Result<Self, NetError> {
        let addr = SocketAddr::new(config.bind_addr, config.port);
        let listener = TcpListener::bind(addr).map_err(|source| NetError::Bind { addr, source })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let code = generate_code();
        let status = LinkStatus::new(ConnectionState::Listening);
        let stats = SharedStats::default();
        let running = Arc::new(AtomicBool::new(true));
        let inbox = Inbox::default();
        let (writer_tx, writer_rx) = mpsc::sync_channel(1);

        let acceptor = Acceptor {
            listener,
            config: config.clone(),
            writer_tx,
            receive: ReceiveParts {
                inbox: inbox.clone(),
                status: status.clone(),
                stats: stats.clone(),
                running: Arc::clone(&running),
            },
        };

        let thread = thread::Builder::new()
            .name("pong-host".into())
            .spawn(move || acceptor.run())?;

        log::info!("hosting on {} with code {}", local_addr, code);

        let link = LinkHandle::new(status, stats, running, inbox)
            .with_pending_writer(writer_rx)
            .with_thread(thread);

        Ok(Self {
            code,
            local_addr,
            link,
            remote_paddle_y: None,
        })
    }

    /// Lobby code shown to the player for sharing.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn stats(&self) -> NetworkStats {
        self.link.stats()
    }

    pub fn send_state(&mut self, state: StateUpdate) -> bool {
        self.link.send(&WireMessage::StateUpdate(state))
    }

    /// Newest client paddle position received since the last poll.
    pub fn poll_remote_paddle(&mut self) -> Option<f32> {
        let y = match self.link.take_newest()? {
            WireMessage::PaddleUpdate { y } => y,
            WireMessage::StateUpdate(_) => return None,
        };
        self.remote_paddle_y = Some(y);
        Some(y)
    }

    /// Last known client paddle position; frozen once the link is lost.
    pub fn remote_paddle_y(&self) -> Option<f32> {
        self.remote_paddle_y
    }

    pub fn close(&mut self) {
        self.link.close();
    }
}

struct ReceiveParts {
    inbox: Inbox,
    status: LinkStatus,
    stats: SharedStats,
    running: Arc<AtomicBool>,
}

struct Acceptor {
    listener: TcpListener,
    config: NetConfig,
    writer_tx: SyncSender<TcpStream>,
    receive: ReceiveParts,
}

impl Acceptor {
    fn run(self) {
        let Acceptor {
            listener,
            config,
            writer_tx,
            receive,
        } = self;

        let stream = loop {
            if !receive.running.load(Ordering::SeqCst) {
                return;
            }
            match listener.accept() {
                Ok((stream, peer)) => {
                    log::info!("client connected from {}", peer);
                    break stream;
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(config.accept_poll_interval);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::warn!("accept failed: {}", e);
                    receive.status.set(ConnectionState::Lost);
                    return;
                }
            }
        };
        drop(listener);

        let writer = match prepare_stream(&stream, &config) {
            Ok(writer) => writer,
            Err(e) => {
                log::warn!("failed to configure client socket: {}", e);
                receive.status.set(ConnectionState::Lost);
                return;
            }
        };
        if writer_tx.send(writer).is_err() {
            return;
        }
        if !receive.status.set(ConnectionState::Connected) {
            return;
        }

        ReceiveLoop {
            stream,
            inbox: receive.inbox,
            status: receive.status,
            stats: receive.stats,
            running: receive.running,
            accepts: |message| matches!(message, WireMessage::PaddleUpdate { .. }),
        }
        .run();
    }
}

/// Switches an accepted or connected socket to blocking I/O with short read
/// and write timeouts and returns a clone for writing.
pub(crate) fn prepare_stream(stream: &TcpStream, config: &NetConfig) -> io::Result<TcpStream> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(config.read_timeout))?;
    stream.set_write_timeout(Some(config.write_timeout))?;
    stream.set_nodelay(true)?;
    stream.try_clone()
}
