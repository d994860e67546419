//! Overview tap - prints every agent frame as a JSON line
//!
//! Run with: cargo run --example overview_tap [AGENTS] [FRAMES]
//!
//! Examples:
//!   cargo run --example overview_tap          # 3 agents, 5 frames each
//!   cargo run --example overview_tap 10 20    # 10 agents, 20 frames each
//!
//! This example demonstrates:
//! - Publishing preview frames from several agent tasks concurrently
//! - Reporting agents offline through the frame stream
//! - Running an overview subscription into a `JsonLinesSink` on stdout
//! - Shutting observers down with `close_all`
//!
//! # Architecture
//!
//! ```text
//!   agent-0 ──┐
//!   agent-1 ──┼──► BroadcastEngine ──► overview(admin) ──► JsonLinesSink ──► stdout
//!   agent-2 ──┘         │
//!                       └──► detail(admin, agent-0) ──► FrameBoard
//! ```
//!
//! Offline markers show up on stdout as lines with an empty `imageBase64`
//! and `timestamp` 0.

use std::sync::Arc;
use std::time::Duration;

use agentcast::{BroadcastEngine, FrameBoard, FrameItem, RegistryConfig, StreamPump};

const DEFAULT_AGENTS: usize = 3;
const DEFAULT_FRAMES: u64 = 5;

fn parse_arg<T: std::str::FromStr>(arg: Option<&String>, default: T) -> Result<T, String> {
    match arg {
        Some(value) => value
            .parse()
            .map_err(|_| format!("Invalid number: '{}'", value)),
        None => Ok(default),
    }
}

fn print_usage() {
    eprintln!("Usage: overview_tap [AGENTS] [FRAMES]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  AGENTS    Number of simulated agents (default: {})", DEFAULT_AGENTS);
    eprintln!("  FRAMES    Frames published by each agent (default: {})", DEFAULT_FRAMES);
}

/// Fake screen capture: a few bytes that change per frame
fn capture(agent: usize, seq: u64) -> Vec<u8> {
    let mut image = vec![0xFF, 0xD8];
    image.extend_from_slice(&(agent as u32).to_be_bytes());
    image.extend_from_slice(&seq.to_be_bytes());
    image
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let (agents, frames) = match (
        parse_arg(args.get(1), DEFAULT_AGENTS),
        parse_arg(args.get(2), DEFAULT_FRAMES),
    ) {
        (Ok(agents), Ok(frames)) => (agents, frames),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    // Logs go to stderr so stdout stays pure JSON lines
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agentcast=debug".parse()?)
                .add_directive("overview_tap=debug".parse()?),
        )
        .init();

    let engine = Arc::new(BroadcastEngine::with_config(
        RegistryConfig::default().queue_capacity(256),
    ));
    let pump = StreamPump::new(Arc::clone(engine.registry()));

    let overview = tokio::spawn({
        let pump = pump.clone();
        async move {
            pump.run_overview("admin", agentcast::JsonLinesSink::new(tokio::io::stdout()))
                .await
        }
    });

    let board = Arc::new(FrameBoard::new());
    let detail = tokio::spawn({
        let board = Arc::clone(&board);
        async move { pump.run_detail("admin", "agent-0", board).await }
    });

    // Let both subscriptions register before anything is published
    while engine.registry().counts().await.total() < 2 {
        tokio::task::yield_now().await;
    }

    let mut producers = Vec::with_capacity(agents);
    for agent in 0..agents {
        let engine = Arc::clone(&engine);
        producers.push(tokio::spawn(async move {
            let agent_id = format!("agent-{}", agent);
            for seq in 1..=frames {
                let timestamp = 1_700_000_000_000 + seq as i64 * 100;
                engine
                    .publish_frame(FrameItem::preview(&*agent_id, capture(agent, seq), timestamp))
                    .await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            engine.publish_agent_offline(&agent_id).await;
        }));
    }

    for producer in producers {
        producer.await?;
    }

    // Give the pumps a moment to drain, then end every subscription
    tokio::time::sleep(Duration::from_millis(100)).await;
    let closed = engine.registry().close_all().await;
    tracing::info!(closed, "Subscriptions closed");

    let overview = overview.await??;
    let detail = detail.await??;

    let stats = engine.stats();
    eprintln!();
    eprintln!(
        "overview: {} lines in {:?}, detail: {} frames, board agents left: {}",
        overview.forwarded,
        overview.duration,
        detail.forwarded,
        board.len()
    );
    eprintln!(
        "engine: frames={} offline={} delivered={} dropped={}",
        stats.frames_published, stats.offline_published, stats.delivered, stats.dropped
    );

    Ok(())
}
