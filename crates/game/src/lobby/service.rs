use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{LobbyError, NetError};
use crate::net::LineReassembler;

use super::matchmaker::{LobbyBackend, Matchmaker};
use super::registry::{QueueStatus, Role};

/// Upper bound on one remote lobby call, connect included.
pub const LOBBY_TIMEOUT: Duration = Duration::from_secs(2);

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const READ_TIMEOUT: Duration = Duration::from_millis(200);
/// Connections that send nothing for this long are closed.
const IDLE_LIMIT: Duration = Duration::from_secs(30);
const READ_BUFFER_SIZE: usize = 1024;

/// One line from a lobby client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LobbyRequest {
    RegisterCode {
        code: String,
        addr: SocketAddr,
        session_id: String,
    },
    ResolveCode {
        code: String,
    },
    JoinQueue {
        session_id: String,
        addr: SocketAddr,
    },
    Cancel {
        session_id: String,
    },
}

/// The service's one-line answer to a [`LobbyRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LobbyResponse {
    Registered { code: String },
    Resolved { addr: SocketAddr },
    Queued,
    Matched { role: Role, peer: SocketAddr },
    Cancelled,
    Failed { error: LobbyError },
}

impl LobbyResponse {
    fn unexpected(self) -> LobbyError {
        match self {
            LobbyResponse::Failed { error } => error,
            other => LobbyError::Unavailable(format!("unexpected reply {:?}", other)),
        }
    }
}

/// A peer that binds the wildcard address advertises the IP the service saw
/// it connect from.
fn advertised(addr: SocketAddr, seen_from: IpAddr) -> SocketAddr {
    if addr.ip().is_unspecified() {
        SocketAddr::new(seen_from, addr.port())
    } else {
        addr
    }
}

fn answer(
    matchmaker: &Matchmaker,
    request: LobbyRequest,
    from: IpAddr,
    now: Instant,
) -> LobbyResponse {
    let result = match request {
        LobbyRequest::RegisterCode { session_id, .. }
        | LobbyRequest::JoinQueue { session_id, .. }
        | LobbyRequest::Cancel { session_id }
            if session_id.trim().is_empty() =>
        {
            Err(LobbyError::BadRequest("empty session id".into()))
        }
        LobbyRequest::RegisterCode {
            code,
            addr,
            session_id,
        } => matchmaker
            .register_code(&code, advertised(addr, from), &session_id, now)
            .map(|code| LobbyResponse::Registered { code }),
        LobbyRequest::ResolveCode { code } => matchmaker
            .resolve_code(&code, now)
            .map(|addr| LobbyResponse::Resolved { addr }),
        LobbyRequest::JoinQueue { session_id, addr } => {
            match matchmaker.join_queue(&session_id, advertised(addr, from), now) {
                QueueStatus::Queued => Ok(LobbyResponse::Queued),
                QueueStatus::Matched { role, peer } => Ok(LobbyResponse::Matched { role, peer }),
            }
        }
        LobbyRequest::Cancel { session_id } => {
            matchmaker.cancel(&session_id);
            Ok(LobbyResponse::Cancelled)
        }
    };
    result.unwrap_or_else(|error| LobbyResponse::Failed { error })
}

/// Serves one shared [`Matchmaker`] over TCP so separate processes can trade
/// lobby codes and meet in the public queue. Each connection carries
/// newline-terminated JSON requests, each answered by one response line.
pub struct LobbyServer {
    local_addr: SocketAddr,
    matchmaker: Matchmaker,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl LobbyServer {
    pub fn start(addr: SocketAddr) -> Result<Self, NetError> {
        Self::with_matchmaker(addr, Matchmaker::new())
    }

    pub fn with_matchmaker(addr: SocketAddr, matchmaker: Matchmaker) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr).map_err(|source| NetError::Bind { addr, source })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let running = Arc::new(AtomicBool::new(true));

        let acceptor = LobbyAcceptor {
            listener,
            matchmaker: matchmaker.clone(),
            running: Arc::clone(&running),
        };
        let thread = thread::Builder::new()
            .name("pong-lobby".into())
            .spawn(move || acceptor.run())?;

        log::info!("lobby service listening on {}", local_addr);

        Ok(Self {
            local_addr,
            matchmaker,
            running,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn matchmaker(&self) -> &Matchmaker {
        &self.matchmaker
    }

    /// Blocks until the accept thread exits.
    pub fn wait(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    pub fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for LobbyServer {
    fn drop(&mut self) {
        self.close();
    }
}

struct LobbyAcceptor {
    listener: TcpListener,
    matchmaker: Matchmaker,
    running: Arc<AtomicBool>,
}

impl LobbyAcceptor {
    fn run(self) {
        while self.running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let connection = LobbyConnection {
                        stream,
                        peer,
                        matchmaker: self.matchmaker.clone(),
                        running: Arc::clone(&self.running),
                    };
                    let spawned = thread::Builder::new()
                        .name("pong-lobby-conn".into())
                        .spawn(move || connection.serve());
                    if let Err(e) = spawned {
                        log::warn!("could not serve lobby client {}: {}", peer, e);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    log::warn!("lobby accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }
        log::info!("lobby service stopped");
    }
}

struct LobbyConnection {
    stream: TcpStream,
    peer: SocketAddr,
    matchmaker: Matchmaker,
    running: Arc<AtomicBool>,
}

impl LobbyConnection {
    fn serve(mut self) {
        if let Err(e) = self.configure() {
            log::debug!("dropping lobby client {}: {}", self.peer, e);
            return;
        }

        let mut reassembler = LineReassembler::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let mut last_activity = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            match self.stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    last_activity = Instant::now();
                    for line in reassembler.push(&buf[..n]) {
                        let response = self.respond(&line);
                        if let Err(e) = self.reply(&response) {
                            log::debug!("lobby reply to {} failed: {}", self.peer, e);
                            return;
                        }
                    }
                }
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                    ) =>
                {
                    if last_activity.elapsed() > IDLE_LIMIT {
                        log::debug!("closing idle lobby client {}", self.peer);
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("lobby client {} failed: {}", self.peer, e);
                    break;
                }
            }
        }
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn configure(&self) -> io::Result<()> {
        self.stream.set_nonblocking(false)?;
        self.stream.set_read_timeout(Some(READ_TIMEOUT))?;
        self.stream.set_write_timeout(Some(LOBBY_TIMEOUT))?;
        self.stream.set_nodelay(true)
    }

    fn respond(&self, line: &str) -> LobbyResponse {
        match serde_json::from_str::<LobbyRequest>(line) {
            Ok(request) => {
                log::debug!("lobby request from {}: {:?}", self.peer, request);
                answer(&self.matchmaker, request, self.peer.ip(), Instant::now())
            }
            Err(e) => LobbyResponse::Failed {
                error: LobbyError::BadRequest(e.to_string()),
            },
        }
    }

    fn reply(&mut self, response: &LobbyResponse) -> io::Result<()> {
        let mut line = serde_json::to_string(response)?;
        line.push('\n');
        self.stream.write_all(line.as_bytes())
    }
}

/// [`LobbyBackend`] reached over TCP, one short connection per call.
#[derive(Debug, Clone)]
pub struct RemoteLobby {
    addr: SocketAddr,
    timeout: Duration,
}

impl RemoteLobby {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: LOBBY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn unavailable(&self, e: io::Error) -> LobbyError {
        LobbyError::Unavailable(format!("{}: {}", self.addr, e))
    }

    fn call(&self, request: &LobbyRequest) -> Result<LobbyResponse, LobbyError> {
        let mut line =
            serde_json::to_string(request).map_err(|e| LobbyError::BadRequest(e.to_string()))?;
        line.push('\n');

        let mut stream =
            TcpStream::connect_timeout(&self.addr, self.timeout).map_err(|e| self.unavailable(e))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| self.unavailable(e))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| self.unavailable(e))?;
        stream
            .write_all(line.as_bytes())
            .map_err(|e| self.unavailable(e))?;

        let deadline = Instant::now() + self.timeout;
        let mut reassembler = LineReassembler::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let reply = loop {
            let n = stream.read(&mut buf).map_err(|e| self.unavailable(e))?;
            if n == 0 {
                return Err(LobbyError::Unavailable(format!(
                    "{} closed the connection without replying",
                    self.addr
                )));
            }
            if let Some(reply) = reassembler.push(&buf[..n]).into_iter().next() {
                break reply;
            }
            if Instant::now() >= deadline {
                return Err(LobbyError::Unavailable(format!("{} timed out", self.addr)));
            }
        };
        let _ = stream.shutdown(Shutdown::Both);

        match serde_json::from_str::<LobbyResponse>(&reply) {
            Ok(LobbyResponse::Failed { error }) => Err(error),
            Ok(response) => Ok(response),
            Err(e) => Err(LobbyError::Unavailable(format!("unreadable reply: {}", e))),
        }
    }
}

impl LobbyBackend for RemoteLobby {
    fn register_code(
        &self,
        code: &str,
        addr: SocketAddr,
        owner: &str,
        _now: Instant,
    ) -> Result<String, LobbyError> {
        let request = LobbyRequest::RegisterCode {
            code: code.to_owned(),
            addr,
            session_id: owner.to_owned(),
        };
        match self.call(&request)? {
            LobbyResponse::Registered { code } => Ok(code),
            other => Err(other.unexpected()),
        }
    }

    fn resolve_code(&self, code: &str, _now: Instant) -> Result<SocketAddr, LobbyError> {
        let request = LobbyRequest::ResolveCode {
            code: code.to_owned(),
        };
        match self.call(&request)? {
            LobbyResponse::Resolved { addr } => Ok(addr),
            other => Err(other.unexpected()),
        }
    }

    fn join_queue(
        &self,
        session_id: &str,
        addr: SocketAddr,
        _now: Instant,
    ) -> Result<QueueStatus, LobbyError> {
        let request = LobbyRequest::JoinQueue {
            session_id: session_id.to_owned(),
            addr,
        };
        match self.call(&request)? {
            LobbyResponse::Queued => Ok(QueueStatus::Queued),
            LobbyResponse::Matched { role, peer } => Ok(QueueStatus::Matched { role, peer }),
            other => Err(other.unexpected()),
        }
    }

    fn cancel(&self, session_id: &str) -> Result<(), LobbyError> {
        let request = LobbyRequest::Cancel {
            session_id: session_id.to_owned(),
        };
        match self.call(&request)? {
            LobbyResponse::Cancelled => Ok(()),
            other => Err(other.unexpected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(ip: [u8; 4], port: u16) -> SocketAddr {
        SocketAddr::from((ip, port))
    }

    #[test]
    fn wildcard_address_takes_connection_ip() {
        let seen = IpAddr::from([192, 168, 1, 20]);
        assert_eq!(
            advertised(addr([0, 0, 0, 0], 5555), seen),
            addr([192, 168, 1, 20], 5555)
        );
        assert_eq!(
            advertised(addr([10, 0, 0, 3], 5555), seen),
            addr([10, 0, 0, 3], 5555)
        );
    }

    #[test]
    fn requests_use_tagged_json() {
        let request = LobbyRequest::ResolveCode {
            code: "AB12CD".into(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"type":"resolve_code","code":"AB12CD"}"#);

        let response: LobbyResponse =
            serde_json::from_str(r#"{"type":"matched","role":"host","peer":"10.0.0.2:5555"}"#)
                .unwrap();
        assert_eq!(
            response,
            LobbyResponse::Matched {
                role: Role::Host,
                peer: addr([10, 0, 0, 2], 5555)
            }
        );

        let failed = serde_json::to_string(&LobbyResponse::Failed {
            error: LobbyError::CodeNotFound,
        })
        .unwrap();
        assert_eq!(failed, r#"{"type":"failed","error":"code_not_found"}"#);
    }

    #[test]
    fn answers_follow_the_registry() {
        let matchmaker = Matchmaker::new();
        let from = IpAddr::from([192, 168, 1, 7]);
        let now = Instant::now();

        let registered = answer(
            &matchmaker,
            LobbyRequest::RegisterCode {
                code: "ab12cd".into(),
                addr: addr([0, 0, 0, 0], 5555),
                session_id: "S1".into(),
            },
            from,
            now,
        );
        assert_eq!(
            registered,
            LobbyResponse::Registered {
                code: "AB12CD".into()
            }
        );

        let resolved = answer(
            &matchmaker,
            LobbyRequest::ResolveCode {
                code: "AB12CD".into(),
            },
            from,
            now,
        );
        assert_eq!(
            resolved,
            LobbyResponse::Resolved {
                addr: addr([192, 168, 1, 7], 5555)
            }
        );

        let rejected = answer(
            &matchmaker,
            LobbyRequest::JoinQueue {
                session_id: " ".into(),
                addr: addr([10, 0, 0, 1], 5555),
            },
            from,
            now,
        );
        assert!(matches!(
            rejected,
            LobbyResponse::Failed {
                error: LobbyError::BadRequest(_)
            }
        ));
        assert_eq!(matchmaker.queue_len(), 0);
    }
}
