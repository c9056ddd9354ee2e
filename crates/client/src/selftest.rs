use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail, ensure};

use pong::{
    Authority, ConnectionState, GameSession, LobbyError, LobbyServer, MatchConfig, Matchmaker,
    MatchmakingClient, MoveDirection, NetConfig, NetworkClient, NetworkHost, QueueStatus,
    RemoteLobby, Role, StateUpdate,
};

const WAIT_LIMIT: Duration = Duration::from_secs(3);

type Check = fn() -> Result<()>;

const CHECKS: [(&str, Check); 4] = [
    ("lobby code registration", lobby_codes),
    ("host/client exchange over loopback", loopback_exchange),
    ("public queue pairing", public_queue),
    ("join by code through the lobby service", lobby_service),
];

/// Runs every check and fails when any of them did.
pub fn run() -> Result<()> {
    let mut failed = 0;
    for (name, check) in CHECKS {
        match check() {
            Ok(()) => log::info!("[ok] {}", name),
            Err(e) => {
                failed += 1;
                log::error!("[failed] {}: {:#}", name, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} self-test checks failed", failed, CHECKS.len());
    }
    log::info!("all {} self-test checks passed", CHECKS.len());
    Ok(())
}

fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        if let Some(value) = poll() {
            return Some(value);
        }
        thread::sleep(Duration::from_millis(10));
    }
    None
}

fn lobby_codes() -> Result<()> {
    let matchmaker = Matchmaker::new();
    let addr = SocketAddr::from(([127, 0, 0, 1], pong::DEFAULT_PORT));
    let host = MatchmakingClient::new(matchmaker.clone(), addr);
    let guest = MatchmakingClient::new(matchmaker, SocketAddr::from(([127, 0, 0, 1], 0)));

    let code = host.register_code(&pong::lobby::generate_code())?;
    let resolved = guest.resolve_code(&code.to_lowercase())?;
    ensure!(resolved == addr, "code resolved to {} instead of {}", resolved, addr);

    match guest.resolve_code("ZZZZZZ") {
        Err(LobbyError::CodeNotFound) => {}
        other => bail!("unknown code gave {:?}", other),
    }
    match guest.resolve_code("bad") {
        Err(LobbyError::InvalidCode(_)) => {}
        other => bail!("malformed code gave {:?}", other),
    }
    Ok(())
}

fn loopback_exchange() -> Result<()> {
    let config = NetConfig::loopback();
    let mut host = NetworkHost::start(&config).context("host failed to listen")?;

    let matchmaker = Matchmaker::new();
    let host_lobby = MatchmakingClient::new(matchmaker.clone(), host.local_addr());
    let code = host_lobby.register_code(host.code())?;
    let guest_lobby = MatchmakingClient::new(matchmaker, SocketAddr::from(([127, 0, 0, 1], 0)));
    let addr = guest_lobby.resolve_code(&code)?;

    let mut client = NetworkClient::connect(addr, &config).context("client failed to connect")?;

    wait_for(|| (host.state().is_connected() && client.state().is_connected()).then_some(()))
        .context("handshake did not complete")?;

    let paddle = wait_for(|| {
        client.send_paddle(123.0);
        host.poll_remote_paddle()
    })
    .context("host never saw the client paddle")?;
    ensure!(paddle == 123.0, "host saw paddle at {}", paddle);

    let sent = StateUpdate {
        paddle_y: 200.0,
        ball_x: 406.72,
        ball_y: 303.696,
        ball_vx: 420.0,
        ball_vy: 231.0,
        score_p: 2,
        score_a: 1,
    };
    let received = wait_for(|| {
        host.send_state(sent);
        client.poll_state()
    })
    .context("client never saw host state")?;
    ensure!(received == sent, "client saw {:?}", received);

    client.close();
    host.close();
    Ok(())
}

fn public_queue() -> Result<()> {
    let matchmaker = Matchmaker::new();
    let first_addr = SocketAddr::from(([127, 0, 0, 1], 6001));
    let second_addr = SocketAddr::from(([127, 0, 0, 1], 6002));
    let mut first = MatchmakingClient::new(matchmaker.clone(), first_addr);
    let mut second = MatchmakingClient::new(matchmaker, second_addr);

    let start = Instant::now();
    ensure!(
        first.join_public_queue_at(start)? == QueueStatus::Queued,
        "first player was not queued"
    );

    let status = second.join_public_queue_at(start)?;
    ensure!(
        status
            == QueueStatus::Matched {
                role: Role::Client,
                peer: first_addr
            },
        "second player got {:?}",
        status
    );

    ensure!(
        first.poll_queue_at(start)?.is_none(),
        "poll inside the interval was not paced"
    );
    let status = first.poll_queue_at(start + first.poll_interval())?;
    ensure!(
        status
            == Some(QueueStatus::Matched {
                role: Role::Host,
                peer: second_addr
            }),
        "first player got {:?}",
        status
    );
    Ok(())
}

fn lobby_service() -> Result<()> {
    let server = LobbyServer::start(SocketAddr::from(([127, 0, 0, 1], 0)))
        .context("lobby service failed to start")?;
    let lobby = RemoteLobby::new(server.local_addr());
    let net = NetConfig::loopback();

    let host = NetworkHost::start(&net).context("host failed to listen")?;
    let mut host_session = GameSession::host_listed(MatchConfig::default(), host, lobby.clone())?;
    let code = match host_session.authority() {
        Authority::Host(host) => host.code().to_owned(),
        _ => bail!("listed session is not hosting"),
    };

    let mut client_session = GameSession::join_code(MatchConfig::default(), &code, lobby, &net)?;
    wait_for(|| {
        host_session.tick(1.0 / 60.0, MoveDirection::None);
        client_session.tick(1.0 / 60.0, MoveDirection::None);
        (host_session.connection_state() == Some(ConnectionState::Connected)
            && client_session
                .network_stats()
                .is_some_and(|stats| stats.messages_received > 0))
        .then_some(())
    })
    .context("code join never produced a live session")?;

    client_session.close();
    host_session.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selftest_passes_on_loopback() {
        run().unwrap();
    }
}
