//! NLUAS Problem Solver Agent
//!
//! Hosts one core solver:
//! - reads one JSON ntuple per line from stdin
//! - writes outbound UI messages as `{"destination", "message"}` JSON lines to stdout
//! - stops on a quit ntuple (`{"text": "QUIT"}`), end of input or Ctrl-C
//!
//! Usage:
//!   nluas-agent --federation FED1 -c 2 < ntuples.jsonl

use clap::Parser;
use nluas::capabilities::defaults::register_default_capabilities;
use nluas::config::{check_complexity, load_solver_config, ClarificationMode, SolverConfig};
use nluas::transport::JsonLinesTransport;
use nluas::{CapabilityRegistry, CoreSolver};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Agent CLI arguments
#[derive(Parser, Debug)]
#[command(name = "nluas-agent")]
#[command(about = "NLUAS Core Problem Solver - routes ntuples to capabilities")]
struct Args {
    /// Path to solver configuration file (TOML or JSON)
    #[arg(long, env = "NLUAS_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Federation prefix for agent addresses
    #[arg(long, env = "NLUAS_FEDERATION")]
    federation: Option<String>,

    /// Indicate level of complexity: 1, 2, or 3
    #[arg(short = 'c', long, value_parser = check_complexity)]
    complexity: Option<u8>,

    /// Log every solved ntuple
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Path to parameter_templates.json
    #[arg(long, env = "NLUAS_TEMPLATES_PATH")]
    templates: Option<PathBuf>,

    /// Ask the UI to clarify ntuples with `*`-marked slots
    #[arg(long)]
    clarify_marked_slots: bool,
}

impl Args {
    /// Priority: CLI > config file > defaults
    fn into_config(self) -> anyhow::Result<SolverConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let config = load_solver_config(path)?;
                info!("Loaded solver configuration from: {}", path.display());
                config
            }
            None => SolverConfig::default(),
        };
        if let Some(federation) = self.federation {
            config.federation = federation;
        }
        if let Some(complexity) = self.complexity {
            config.complexity = complexity;
        }
        if self.verbose {
            config.verbose = true;
        }
        if let Some(templates) = self.templates {
            config.templates_path = Some(templates);
        }
        if self.clarify_marked_slots {
            config.clarification = ClarificationMode::MarkedSlots;
        }
        config.validate_config()?;
        Ok(config)
    }
}

async fn run(mut solver: CoreSolver) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("input closed, shutting down");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let message: Value = match serde_json::from_str(&line) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Skipping undecodable ntuple: {}", e);
                        continue;
                    }
                };
                if !solver.handle_message(message) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }
    info!(
        "Solver stopped: {} attempted actions, {} world items",
        solver.history().len(),
        solver.world().len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the outbound messages
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nluas=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Args::parse().into_config()?;
    info!("Core Problem Solver starting...");
    info!("Address: {}", config.address());
    info!("UI address: {}", config.ui_address());
    info!("Complexity: {}", config.complexity);

    let mut registry = CapabilityRegistry::new();
    register_default_capabilities(&mut registry);
    info!("Capabilities: {}", registry.capability_names().join(", "));

    let transport = Arc::new(JsonLinesTransport::new(std::io::stdout()));
    let solver = match CoreSolver::from_config(config, registry, transport) {
        Ok(solver) => solver,
        Err(e) => {
            error!("Failed to start solver: {}", e);
            std::process::exit(1);
        }
    };

    run(solver).await
}
