use serde_json::json;
use tetris_duel::{session::run_local_match, NetConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: {} <seed1> <seed2> [frames]", args[0]);
        std::process::exit(1);
    }
    let seed1: u64 = args[1].parse()?;
    let seed2: u64 = args[2].parse()?;
    let frames: u64 = match args.get(3) {
        Some(f) => f.parse()?,
        None => 600,
    };

    let (p1, p2) = run_local_match((seed1, seed2), frames, NetConfig::default()).await?;

    let leader = match p1.score.cmp(&p2.score) {
        std::cmp::Ordering::Greater => Some("player1"),
        std::cmp::Ordering::Less => Some("player2"),
        std::cmp::Ordering::Equal => None,
    };

    let result = json!({
        "player1": p1,
        "player2": p2,
        "leader": leader,
    });

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
