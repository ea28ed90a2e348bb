use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tether_client::{
    CallStatus, ClientConfig, SessionManager, SignalingLink, StatusChannel, SyntheticCapture,
    WebRtcConnectionFactory, WsTransport,
};
use tether_core::RoomId;
use tether_relay::RelayConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cargo-tether")]
#[command(bin_name = "cargo-tether")]
enum Cli {
    Tether(TetherArgs),
}

#[derive(clap::Args)]
struct TetherArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay {
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
    },

    /// Place a call into a room.
    Call {
        #[command(flatten)]
        peer: PeerArgs,
    },

    /// Wait in a room and answer the first offer.
    Answer {
        #[command(flatten)]
        peer: PeerArgs,
    },
}

#[derive(clap::Args)]
struct PeerArgs {
    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    room: String,

    /// JSON client config; flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
}

enum Role {
    Call,
    Answer,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Cli::Tether(args) = Cli::parse();

    match args.command {
        Commands::Relay { bind } => {
            println!("{}", "📡 Starting Tether relay...".green().bold());
            tether_relay::serve(RelayConfig { bind }).await
        }
        Commands::Call { peer } => run_peer(peer, Role::Call).await,
        Commands::Answer { peer } => run_peer(peer, Role::Answer).await,
    }
}

async fn run_peer(args: PeerArgs, role: Role) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = args.url {
        config.signaling_url = url;
    }
    let room = RoomId::new(args.room).context("Invalid room name")?;

    let transport = Arc::new(WsTransport::new(
        config.signaling_url.clone(),
        config.reconnect,
    ));
    let (link, events) = SignalingLink::new(transport);
    let (observer, mut statuses) = StatusChannel::new();

    let manager = SessionManager::new(
        Arc::new(link),
        Arc::new(WebRtcConnectionFactory::new(config.transport.clone())),
        Arc::new(SyntheticCapture::new()),
        Arc::new(observer),
        &config,
    );
    let pump = manager.spawn(events);

    println!(
        "{} {} via {}",
        "🔗 Joining room".cyan(),
        room.to_string().bold(),
        config.signaling_url
    );
    match role {
        Role::Call => manager.start_call(room.clone()).await?,
        Role::Answer => {
            manager.listen(room.clone()).await?;
            println!("{}", "⏳ Waiting for an offer...".cyan());
        }
    }

    let mut was_live = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "👋 Hanging up".yellow());
                break;
            }
            update = statuses.recv() => {
                let Some((room, status)) = update else {
                    break;
                };
                print_status(&room, &status);

                match status {
                    CallStatus::Error(_) => break,
                    CallStatus::Idle if was_live => break,
                    CallStatus::Idle => {}
                    _ => was_live = true,
                }
            }
        }
    }

    manager.shutdown().await;
    pump.abort();
    Ok(())
}

fn print_status(room: &RoomId, status: &CallStatus) {
    let room = format!("[{room}]").dimmed();
    match status {
        CallStatus::Idle => println!("{room} {}", "idle".normal()),
        CallStatus::Negotiating => println!("{room} {}", "negotiating".yellow()),
        CallStatus::Connected => println!("{room} {}", "✨ connected".green().bold()),
        CallStatus::Error(reason) => println!("{room} {} {reason}", "error:".red().bold()),
        CallStatus::RemoteStreamAvailable(stream) => println!(
            "{room} {} {} ({} tracks)",
            "📺 remote stream".cyan(),
            stream.stream_id(),
            stream.tracks().len()
        ),
    }
}
