#[cfg(not(feature = "std"))]
fn main() {}

#[cfg(feature = "std")]
use std::sync::Arc;

#[cfg(feature = "std")]
use clap::{Parser, ValueEnum};
#[cfg(feature = "std")]
use rand::rngs::SmallRng;
#[cfg(feature = "std")]
use rand::{Rng, SeedableRng};
#[cfg(feature = "std")]
use tetris_duel::{
    config::INPUT_CHANNEL_CAPACITY,
    init_logging,
    player::{spawn_input, AutoInput, CliInput, InputSource},
    render::{RenderSink, TextRender},
    scores::JsonFileStore,
    session::{parse_peer, run_local_match, NodeOptions, PeerNode},
    transport::{Transport, UdpTransport},
    EngineConfig, GameEngine, NetConfig,
};
#[cfg(feature = "std")]
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[cfg(feature = "std")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Debug)]
#[cfg(feature = "std")]
enum PlayerType {
    Human,
    Ai,
}

#[derive(Parser)]
#[cfg(feature = "std")]
enum Commands {
    /// Play against a peer over UDP.
    Play {
        #[arg(long, help = "Peer address, ip or ip:port")]
        peer: String,
        #[arg(long, default_value_t = tetris_duel::config::DEFAULT_PORT)]
        port: u16,
        #[arg(long, value_enum, default_value_t = PlayerType::Human)]
        player: PlayerType,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
        #[arg(long, default_value = tetris_duel::scores::DEFAULT_SCORES_FILE)]
        scores: String,
    },
    /// Run two AI peers against each other in this process.
    Local {
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
        #[arg(long, default_value_t = 3600)]
        frames: u64,
    },
}

#[cfg(feature = "std")]
fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

#[cfg(feature = "std")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            peer,
            port,
            player,
            seed,
            scores,
        } => {
            let net = NetConfig {
                port,
                ..NetConfig::default()
            };
            let peer = parse_peer(&peer, port)?;
            let transport: Arc<dyn Transport> =
                Arc::new(UdpTransport::bind(net.port, net.recv_timeout).await?);
            let mut rng = make_rng(seed);
            let engine = GameEngine::new(EngineConfig::default(), rng.random())?;

            let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
            let (source, auto_confirm): (Box<dyn InputSource>, bool) = match player {
                PlayerType::Human => (Box::new(CliInput::new()), false),
                PlayerType::Ai => (Box::new(AutoInput::new(rng, net.frame_period * 8)), true),
            };
            let _input = spawn_input(source, tx);

            let render: Box<dyn RenderSink> = Box::new(TextRender::stdout(30));
            let node = PeerNode::new(transport, peer, net, engine, rx)
                .with_render(render)
                .with_scores(Box::new(JsonFileStore::new(scores)))
                .with_options(NodeOptions {
                    auto_confirm,
                    ..NodeOptions::default()
                });
            let report = node.run().await?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Commands::Local { seed, frames } => {
            println!("Starting local AI vs AI game...");
            if let Some(s) = seed {
                println!("Using fixed seed: {} (game will be reproducible)", s);
            }
            let mut rng = make_rng(seed);
            let seeds = (rng.random(), rng.random());
            let (r1, r2) = run_local_match(seeds, frames, NetConfig::default()).await?;
            println!("player1: {}", serde_json::to_string(&r1)?);
            println!("player2: {}", serde_json::to_string(&r2)?);
        }
    }
    Ok(())
}
