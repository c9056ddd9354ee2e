mod app;
mod config;
mod demo;
mod input;
mod selftest;
mod tui;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pong::{
    GameSession, LobbyServer, MatchConfig, MatchmakingClient, NetworkClient, NetworkHost,
    RemoteLobby,
};

use app::Scene;
use config::{DifficultyArg, JoinTarget, bind_config, join_target, lobby_addr};
use demo::DemoMatch;

#[derive(Parser)]
#[command(name = "pong")]
#[command(about = "Two-paddle ball game against the AI or over the LAN")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play against the AI on this machine
    Local {
        #[arg(short, long, value_enum, default_value_t = DifficultyArg::Medium)]
        difficulty: DifficultyArg,

        #[arg(long, help = "Run without a terminal UI, the AI drives both paddles")]
        headless: bool,

        #[arg(long, help = "Stop after this many ticks")]
        ticks: Option<u64>,

        #[arg(long, help = "Seed for the serve direction")]
        seed: Option<u64>,
    },

    /// Host a LAN match and wait for one opponent
    Host {
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,

        #[arg(short, long, default_value_t = pong::DEFAULT_PORT)]
        port: u16,

        #[arg(long, help = "Lobby service to list the match code with")]
        lobby: Option<String>,

        #[arg(long)]
        headless: bool,
    },

    /// Join a LAN match by TARGET: an address (`ip` or `ip:port`) or a lobby code
    Join {
        target: String,

        #[arg(short, long, default_value_t = pong::DEFAULT_PORT, help = "Port used when TARGET has none")]
        port: u16,

        #[arg(long, default_value = "127.0.0.1", help = "Lobby service that resolves codes")]
        lobby: String,

        #[arg(long)]
        headless: bool,
    },

    /// Wait in the lobby's public queue and play whoever turns up
    Queue {
        #[arg(long, default_value = "127.0.0.1")]
        lobby: String,

        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,

        #[arg(short, long, default_value_t = pong::DEFAULT_PORT)]
        port: u16,

        #[arg(long, default_value_t = 120, help = "Seconds to wait for an opponent")]
        wait: u64,

        #[arg(long)]
        headless: bool,
    },

    /// Run the lobby service that hands out codes and pairs queued players
    Lobby {
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,

        #[arg(short, long, default_value_t = pong::DEFAULT_LOBBY_PORT)]
        port: u16,
    },

    /// Attract mode, two demo AIs playing each other
    Demo {
        #[arg(long, help = "Stop after this many ticks")]
        ticks: Option<u64>,

        #[arg(long)]
        headless: bool,
    },

    /// Loopback check of lobby codes, the LAN link, the public queue and the lobby service
    Selftest,
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Local {
            difficulty,
            headless,
            ticks,
            seed,
        } => {
            let config = MatchConfig::with_difficulty(difficulty.into());
            let session = match seed {
                Some(seed) => GameSession::local_seeded(config, seed),
                None => GameSession::local(config),
            };
            run(Scene::Session(session), headless, ticks)
        }
        Command::Host {
            bind,
            port,
            lobby,
            headless,
        } => {
            let net = bind_config(&bind, port)?;
            let host = NetworkHost::start(&net).context("failed to start hosting")?;
            let session = match lobby {
                Some(lobby) => {
                    let lobby = RemoteLobby::new(lobby_addr(&lobby)?);
                    GameSession::host_listed(MatchConfig::default(), host, lobby)
                        .context("failed to list the match code")?
                }
                None => GameSession::host(MatchConfig::default(), host),
            };
            run(Scene::Session(session), headless, None)
        }
        Command::Join {
            target,
            port,
            lobby,
            headless,
        } => {
            let net = pong::NetConfig::default();
            let session = match join_target(&target, port)? {
                JoinTarget::Addr(addr) => {
                    let client = NetworkClient::connect(addr, &net)
                        .with_context(|| format!("failed to join {}", addr))?;
                    GameSession::client(MatchConfig::default(), client)
                }
                JoinTarget::Code(code) => {
                    let lobby = RemoteLobby::new(lobby_addr(&lobby)?);
                    GameSession::join_code(MatchConfig::default(), &code, lobby, &net)
                        .with_context(|| format!("failed to join code {}", code))?
                }
            };
            run(Scene::Session(session), headless, None)
        }
        Command::Queue {
            lobby,
            bind,
            port,
            wait,
            headless,
        } => {
            if headless {
                init_logging();
            }
            let lobby = RemoteLobby::new(lobby_addr(&lobby)?);
            let net = bind_config(&bind, port)?;
            let host = NetworkHost::start(&net).context("failed to open a port for the match")?;

            let mut queue = MatchmakingClient::new(lobby, host.local_addr());
            eprintln!("waiting up to {}s for an opponent in the public queue", wait);
            let (role, peer) = queue
                .wait_for_match(Duration::from_secs(wait))
                .context("public queue failed")?
                .with_context(|| format!("no opponent turned up within {}s", wait))?;
            drop(queue);

            let session = GameSession::matched(MatchConfig::default(), role, peer, host, &net)
                .with_context(|| format!("failed to reach matched opponent {}", peer))?;
            run(Scene::Session(session), headless, None)
        }
        Command::Lobby { bind, port } => {
            init_logging();
            let net = bind_config(&bind, port)?;
            let server = LobbyServer::start(SocketAddr::new(net.bind_addr, net.port))
                .context("failed to start the lobby service")?;
            server.wait();
            Ok(())
        }
        Command::Demo { ticks, headless } => {
            let scene = Scene::Demo(DemoMatch::new(MatchConfig::default()));
            run(scene, headless, ticks)
        }
        Command::Selftest => {
            init_logging();
            selftest::run()
        }
    }
}

fn run(scene: Scene, headless: bool, ticks: Option<u64>) -> Result<()> {
    if headless {
        init_logging();
        app::run_headless(scene, ticks)
    } else {
        app::run_with_tui(scene, ticks)
    }
}

/// Log lines only go to stderr outside the terminal UI, where they would
/// tear the screen.
fn init_logging() {
    // The queue path may have set it up before the session starts.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
