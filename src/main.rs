//! Command-line interface for cdc-stress
//!
//! # Usage Examples
//!
//! ## Rate sweep
//! ```bash
//! # 5K, 10K, ... 30K changes/sec, 10 seconds per point
//! cdc-stress sweep \
//!   --neo4j-uri bolt://localhost:7687 \
//!   --neo4j-password secret \
//!   --rate-start 5000 --rate-step 5000 --rate-end 30000
//!
//! # Same sweep with direct capture, results also written as JSON
//! cdc-stress sweep --capture direct --json-output results.json
//! ```
//!
//! ## Single point
//! ```bash
//! cdc-stress once --rate 20000 --consumers 8 --test-duration 30s
//! ```
//!
//! Logging is controlled with `RUST_LOG`, e.g. `RUST_LOG=info`.

use anyhow::Context;
use cdc_capture::{CaptureClient, DirectCapture, QueueCapture};
use cdc_core::{ChangeFeed, ChangeWriter, FeedControl, MemoryGraph};
use cdc_loadgen::RateLimitedLoadGenerator;
use cdc_neo4j::{new_neo4j_client, Neo4jArgs, Neo4jCdc};
use cdc_stress::{
    report, Backend, CaptureKind, CaptureOpts, LoadOpts, RatePlan, StressConfig,
    StressOrchestrator, TimingOpts,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cdc-stress")]
#[command(about = "Stress test change data capture throughput against a rate limited write load")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure a range of target change rates
    Sweep {
        /// First target rate (changes/sec)
        #[arg(long, default_value = "5000")]
        rate_start: u64,

        /// Increment between target rates
        #[arg(long, default_value = "5000")]
        rate_step: u64,

        /// Last target rate (inclusive)
        #[arg(long, default_value = "30000")]
        rate_end: u64,

        #[command(flatten)]
        stress: StressArgs,
    },

    /// Measure a single target change rate
    Once {
        /// Target rate (changes/sec)
        #[arg(long)]
        rate: u64,

        #[command(flatten)]
        stress: StressArgs,
    },
}

/// Options shared by every subcommand.
#[derive(Args)]
struct StressArgs {
    /// Backend under test
    #[arg(long, value_enum, default_value = "neo4j")]
    backend: Backend,

    #[command(flatten)]
    neo4j: Neo4jArgs,

    #[command(flatten)]
    capture: CaptureOpts,

    #[command(flatten)]
    load: LoadOpts,

    #[command(flatten)]
    timing: TimingOpts,

    /// Also write every observation to this file as JSON
    #[arg(long, value_name = "PATH")]
    json_output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let (plan, stress) = match cli.command {
        Commands::Sweep {
            rate_start,
            rate_step,
            rate_end,
            stress,
        } => (RatePlan::new(rate_start, rate_step, rate_end)?, stress),
        Commands::Once { rate, stress } => (RatePlan::new(rate, 1, rate)?, stress),
    };

    run_stress(plan, stress).await
}

async fn run_stress(plan: RatePlan, args: StressArgs) -> anyhow::Result<()> {
    let (feed, writer, control): (
        Arc<dyn ChangeFeed>,
        Arc<dyn ChangeWriter>,
        Arc<dyn FeedControl>,
    ) = match args.backend {
        Backend::Memory => {
            let graph = Arc::new(MemoryGraph::new());
            (graph.clone(), graph.clone(), graph)
        }
        Backend::Neo4j => {
            let graph = new_neo4j_client(&args.neo4j)
                .await
                .with_context(|| format!("Failed to connect to Neo4j at {}", args.neo4j.neo4j_uri))?;
            let cdc = Arc::new(Neo4jCdc::new(graph));
            (cdc.clone(), cdc.clone(), cdc)
        }
    };

    let config = args.capture.capture_config();
    let processor = args.capture.processor();
    let capture: Box<dyn CaptureClient> = match args.capture.capture {
        CaptureKind::Queue => Box::new(QueueCapture::new(feed, config).with_processor(processor)),
        CaptureKind::Direct => Box::new(DirectCapture::new(feed, config).with_processor(processor)),
    };
    let generator = RateLimitedLoadGenerator::new(writer, args.load.load_config());

    tracing::info!(
        backend = ?args.backend,
        capture = capture.name(),
        "Starting stress test"
    );

    let mut orchestrator =
        StressOrchestrator::new(control, capture, generator, StressConfig::from(&args.timing));

    println!("{}", report::header());
    let observations = orchestrator
        .sweep(&plan, |observation| {
            println!("{}", report::format_row(observation));
        })
        .await?;

    if let Some(path) = &args.json_output {
        report::write_json(path, &observations)?;
        tracing::info!("Wrote {} observations to {}", observations.len(), path.display());
    }

    Ok(())
}
