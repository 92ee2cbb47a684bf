//! tiercache simulator
//!
//! Runs a cached and a baseline simulation side by side and prints the
//! comparison.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tiercache::{
    MemorySecondTier, RunEvent, RunSources, RunStatus, SecondTierStore, SimulatedSource,
    SimulationConfig, SimulationController, encode_metrics, init_metrics,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "tiercache")]
#[command(about = "Two-tier query cache simulator with a learned admission policy", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of queries per run
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// Seed for the workload and policy RNGs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Exploration probability
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Emit events and the final report as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics after the comparison
    #[arg(long)]
    metrics: bool,
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    if let Some(iterations) = args.iterations {
        config.run.iterations = iterations;
    }
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    if let Some(epsilon) = args.epsilon {
        config.policy.epsilon = epsilon;
    }
    if args.json {
        config.logging.format = "json".to_string();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_tracing(config: &SimulationConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn open_second_tier(config: &SimulationConfig) -> Result<Arc<dyn SecondTierStore>> {
    #[cfg(feature = "redis-tier")]
    if let Some(url) = &config.cache.redis_url {
        let store = tiercache::RedisSecondTier::connect(url)
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", url))?;
        return Ok(Arc::new(store));
    }

    if config.cache.redis_url.is_some() {
        warn!("cache.redis_url is set but the redis-tier feature is disabled; using in-memory second tier");
    }
    Ok(Arc::new(MemorySecondTier::new()))
}

/// Drain one run's events until its terminal marker
async fn report_events(mut events: UnboundedReceiver<RunEvent>, json: bool) {
    while let Some(event) = events.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to encode event: {}", e),
            }
        } else {
            match &event {
                RunEvent::Progress(p) => info!(
                    "[{}] iteration {}: rolling avg {:.2} ms (fast={} second={} source={})",
                    p.label,
                    p.iteration,
                    p.rolling_avg_latency_ms,
                    p.tier_hits.fast,
                    p.tier_hits.second,
                    p.tier_hits.source
                ),
                RunEvent::Summary(s) => info!(
                    "[{}] finished {} queries, avg {:.2} ms",
                    s.label, s.total_iterations, s.avg_latency_ms
                ),
                RunEvent::Failed { label, error } => error!("[{}] run failed: {}", label, error),
                RunEvent::Done { .. } => {}
            }
        }

        if event.is_terminal() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_tracing(&config);
    init_metrics();

    info!("Starting tiercache v{}", env!("CARGO_PKG_VERSION"));

    // One source per run, seeded like the workloads
    let seed = config.run.seed;
    let sources = RunSources::new(
        Arc::new(SimulatedSource::new(config.source.clone(), seed)),
        Arc::new(SimulatedSource::new(
            config.source.clone(),
            seed.map(|s| s.wrapping_add(1)),
        )),
    );
    let second_tier = open_second_tier(&config).await?;

    let controller = SimulationController::new(config);
    let streams = controller.start(sources, second_tier).await?;

    tokio::join!(
        report_events(streams.cached, args.json),
        report_events(streams.baseline, args.json)
    );

    let report = controller.wait().await;
    match (controller.poll(), report) {
        (RunStatus::Completed, Some(report)) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        (RunStatus::Failed(reason), _) => {
            anyhow::bail!("Simulation failed: {}", reason);
        }
        (status, _) => {
            anyhow::bail!("Simulation ended in unexpected state {:?}", status);
        }
    }

    if args.metrics {
        let metrics = encode_metrics().map_err(|e| anyhow::anyhow!("{}", e))?;
        print!("{}", metrics);
    }

    Ok(())
}
