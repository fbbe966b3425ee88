//! Exchange-sim demo binary.
//!
//! Wires a replay feed (loaded from JSON or synthesized as a random walk),
//! one exchange agent, and a small population of example traders, then runs
//! the kernel over the session and prints the run counters.

use std::fs::File;
use std::io::BufReader;
use std::time::Instant;

use agents::{ImbalanceTaker, ImbalanceTakerConfig, NoiseTrader, NoiseTraderConfig};
use clap::Parser;
use kernel::{ExchangeAgent, Kernel, KernelConfig, RecordedFeed, ReplayOrder, ReplaySource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;
use types::{AgentId, Cash, FeeSchedule, Price, Quantity, Side};

/// Discrete-event limit-order-book market simulator
#[derive(Parser, Debug)]
#[command(name = "exchange-sim")]
#[command(about = "Replay a recorded order feed through a simulated exchange")]
#[command(version)]
struct Args {
    /// Path to a JSON replay feed; when absent a synthetic feed is generated
    #[arg(long)]
    replay: Option<String>,

    /// Instrument symbol for the synthetic feed
    #[arg(long, default_value = "ACME")]
    symbol: String,

    /// Synthetic session length in simulated seconds
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,

    /// Milliseconds between synthetic feed timestamps
    #[arg(long, default_value_t = 50)]
    feed_interval_ms: u64,

    /// Initial price for the synthetic feed
    #[arg(long, default_value_t = 100.0)]
    initial_price: f64,

    /// Number of noise traders
    #[arg(long, default_value_t = 3)]
    noise_traders: usize,

    /// Number of imbalance takers
    #[arg(long, default_value_t = 1)]
    takers: usize,

    /// Maker rebate per fill leg (positive credits the resting side)
    #[arg(long, default_value_t = 0.0)]
    maker_rebate: f64,

    /// Taker fee per fill leg (positive values are charged)
    #[arg(long, default_value_t = 0.0)]
    taker_fee: f64,

    /// Random seed for the session
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

/// Generate a random-walk feed: at each timestamp a few limit orders quote
/// around a drifting reference price.
fn synthesize_feed(args: &Args) -> RecordedFeed {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut reference = args.initial_price;
    let mut records = Vec::new();
    let mut external_id = 0u64;

    let horizon = args.duration_secs * 1000;
    let mut timestamp = 0;
    while timestamp <= horizon {
        reference *= 1.0 + rng.random_range(-0.001..0.001);
        for _ in 0..rng.random_range(1..=3u32) {
            external_id += 1;
            let side = if rng.random_bool(0.5) {
                Side::Buy
            } else {
                Side::Sell
            };
            let offset = rng.random_range(0.01..0.50);
            let price = match side {
                Side::Buy => reference - offset,
                Side::Sell => reference + offset,
            };
            records.push((
                timestamp,
                ReplayOrder {
                    id: external_id,
                    side,
                    price: Price::from_float(price.max(0.01)),
                    volume: Quantity(rng.random_range(1..=100)),
                },
            ));
        }
        timestamp += args.feed_interval_ms.max(1);
    }
    RecordedFeed::new(args.symbol.clone(), records)
}

fn load_feed(path: &str) -> std::io::Result<RecordedFeed> {
    let file = File::open(path)?;
    RecordedFeed::from_json_reader(BufReader::new(file)).map_err(Into::into)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let feed = match &args.replay {
        Some(path) => load_feed(path)?,
        None => synthesize_feed(&args),
    };
    info!(
        symbol = feed.symbol(),
        orders = feed.order_count(),
        start = feed.start_time(),
        end = feed.end_time(),
        "feed ready"
    );

    let fees = FeeSchedule::new(
        Cash::from_float(args.maker_rebate),
        Cash::from_float(-args.taker_fee),
    );
    let exchange = ExchangeAgent::new(AgentId(1), [feed.symbol().to_string()], 5, fees);

    let mut kernel = Kernel::new(KernelConfig::default().with_seed(args.seed));
    kernel.mount_exchange(exchange)?;

    let mut next_agent_id = 2u64;
    for i in 0..args.noise_traders {
        let config = NoiseTraderConfig {
            symbol: feed.symbol().to_string(),
            initial_price: Price::from_float(args.initial_price),
            ..Default::default()
        };
        kernel.add_agent(Box::new(NoiseTrader::with_seed(
            AgentId(next_agent_id),
            config,
            args.seed.wrapping_add(1 + i as u64),
        )))?;
        next_agent_id += 1;
    }
    for i in 0..args.takers {
        let config = ImbalanceTakerConfig {
            symbol: feed.symbol().to_string(),
            ..Default::default()
        };
        kernel.add_agent(Box::new(ImbalanceTaker::with_seed(
            AgentId(next_agent_id),
            config,
            args.seed.wrapping_add(100 + i as u64),
        )))?;
        next_agent_id += 1;
    }

    let started = Instant::now();
    let summary = kernel.run(&feed)?;
    let elapsed = started.elapsed();

    eprintln!();
    eprintln!("session {} .. {} ms (finished at {} ms)", summary.start_time, summary.end_time, summary.final_time);
    eprintln!("  replayed orders:    {}", summary.replayed_orders);
    eprintln!("  messages delivered: {}", summary.delivered);
    eprintln!("  dropped past end:   {}", summary.dropped);
    eprintln!("  suppressed:         {}", summary.suppressed);
    eprintln!("  wall time:          {:.3}s", elapsed.as_secs_f64());

    Ok(())
}
