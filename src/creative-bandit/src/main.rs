//! Creative Bandit: per-segment creative selection with Thompson Sampling.
//!
//! Command-line driver for the offline simulator and for replaying recorded
//! feedback into a fresh engine. Results go to stdout as JSON; logs go to
//! stderr.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use creative_bandit::{rng_from_seed, BanditEngine, SegmentSignals};
use creative_core::{EngineConfig, FeedbackPolicy};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "creative-bandit")]
#[command(about = "Thompson Sampling creative selection engine")]
#[command(version)]
struct Cli {
    /// Seed for the pseudorandom source (overrides config)
    #[arg(long, global = true, env = "CREATIVE_BANDIT__SEED")]
    seed: Option<u64>,

    /// Reject feedback for arms that were never selected
    #[arg(long, global = true, default_value_t = false)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the synthetic-impression simulator for one segment
    Simulate {
        /// Segment to simulate (e.g. a region code)
        #[arg(long)]
        segment: String,

        /// Candidate as ID or ID=QUALITY; repeat for each creative
        #[arg(long = "candidate", required = true, value_parser = parse_candidate)]
        candidates: Vec<(String, Option<f64>)>,

        /// Number of rounds (overrides config)
        #[arg(long)]
        iterations: Option<u64>,
    },
    /// Apply newline-delimited JSON feedback events and print the snapshot
    Replay {
        /// File with one {"segment","candidate_id","clicked"} object per line
        #[arg(long)]
        input: PathBuf,

        /// Arm to create before replaying, as SEGMENT/ID; repeat as needed
        #[arg(long = "register", value_parser = parse_arm)]
        register: Vec<(String, String)>,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Deserialize)]
struct FeedbackEvent {
    segment: String,
    candidate_id: String,
    clicked: bool,
}

fn parse_candidate(raw: &str) -> Result<(String, Option<f64>), String> {
    match raw.split_once('=') {
        Some((id, quality)) => {
            let quality: f64 = quality
                .parse()
                .map_err(|e| format!("invalid quality for {id}: {e}"))?;
            Ok((id.to_string(), Some(quality)))
        }
        None => Ok((raw.to_string(), None)),
    }
}

fn parse_arm(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('/') {
        Some((segment, id)) if !segment.is_empty() && !id.is_empty() => {
            Ok((segment.to_string(), id.to_string()))
        }
        _ => Err(format!("expected SEGMENT/ID, got {raw}")),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "creative_bandit=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });

    // Apply CLI overrides
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if cli.strict {
        config.feedback.policy = FeedbackPolicy::Strict;
    }

    info!(
        seed = ?config.seed,
        policy = ?config.feedback.policy,
        "Configuration loaded"
    );

    match cli.command {
        Command::Simulate {
            segment,
            candidates,
            iterations,
        } => simulate(&config, &segment, candidates, iterations),
        Command::Replay { input, register } => replay(&config, &input, &register),
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn simulate(
    config: &EngineConfig,
    segment: &str,
    candidates: Vec<(String, Option<f64>)>,
    iterations: Option<u64>,
) -> anyhow::Result<()> {
    let engine = BanditEngine::from_config(config)?;
    let sim = engine.simulation(config)?;
    let signals = SegmentSignals::from_config(&config.simulation);
    let world: Vec<_> = candidates
        .iter()
        .map(|(id, quality)| signals.candidate(segment, id, *quality))
        .collect();

    let mut rng = rng_from_seed(config.seed);
    let iterations = iterations.unwrap_or(config.simulation.iterations);
    let report = sim.run(segment, &world, iterations, &mut rng)?;

    let output = serde_json::json!({
        "report": report,
        "summary": engine.segment_summary(segment),
        "snapshot": engine.snapshot(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn replay(config: &EngineConfig, input: &Path, register: &[(String, String)]) -> anyhow::Result<()> {
    let engine = BanditEngine::from_config(config)?;
    for (segment, candidate_id) in register {
        engine.store().ensure(segment, candidate_id);
    }
    let file = std::fs::File::open(input)
        .with_context(|| format!("opening feedback file {}", input.display()))?;

    let mut applied = 0u64;
    let mut rejected = 0u64;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: FeedbackEvent = serde_json::from_str(&line)
            .with_context(|| format!("line {}: malformed feedback event", line_no + 1))?;
        match engine.update(&event.segment, &event.candidate_id, event.clicked) {
            Ok(_) => applied += 1,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "feedback rejected");
                rejected += 1;
            }
        }
    }

    if applied == 0 && rejected > 0 {
        bail!("all {rejected} feedback events were rejected");
    }
    info!(applied, rejected, arms = engine.store().len(), "replay finished");
    println!("{}", engine.reporter().to_json()?);
    Ok(())
}
