// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! ReactLog CLI
//!
//! Replays recorded lifecycle traces through a kernel and validates config files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reactlog_cli::{read_trace, replay, CliConfig, ReplaySummary};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reactlog")]
#[command(about = "ReactLog - component lifecycle instrumentation", long_about = None)]
struct Cli {
    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines trace of lifecycle signals
    Replay {
        /// Trace file
        trace: PathBuf,

        /// Config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Remote log endpoint, overrides the config file
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Validate a config file and print the resolved settings
    CheckConfig {
        /// Config file (TOML)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            trace,
            config,
            endpoint,
        } => {
            let mut settings = match &config {
                Some(path) => CliConfig::load(path)?,
                None => CliConfig::default(),
            }
            .with_env_overrides();
            if let Some(endpoint) = endpoint {
                settings = settings.with_endpoint(endpoint);
            }
            settings.validate()?;

            let signals = read_trace(&trace)?;
            info!(events = signals.len(), trace = %trace.display(), "Replaying trace");
            let summary = replay(signals, &settings).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::CheckConfig { file } => {
            let settings = CliConfig::load(&file)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("✓ {} is valid", file.display());
                println!();
                print!(
                    "{}",
                    toml::to_string_pretty(&settings).context("Failed to render config")?
                );
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &ReplaySummary) {
    println!("Replay Summary");
    println!("==============");
    println!();
    println!("Events: {}", summary.events);
    for (kind, count) in &summary.by_kind {
        println!("  {kind}: {count}");
    }

    println!();
    println!("Renders:");
    if summary.renders.is_empty() {
        println!("  (none)");
    }
    for (component, tally) in &summary.renders {
        println!(
            "  {component}: {} renders, {} failed, max count {}",
            tally.renders, tally.failed, tally.max_render_count
        );
    }

    if !summary.live_components.is_empty() {
        println!();
        println!("Still mounted: {}", summary.live_components.join(", "));
    }

    if let Some(stats) = &summary.remote_log {
        println!();
        println!(
            "Remote log: {} sent in {} flushes, {} failed flushes",
            stats.entries_sent, stats.flushes, stats.failed_flushes
        );
    }

    println!();
    if summary.errors.is_empty() {
        println!("✓ No errors reported");
    } else {
        println!("✗ {} errors reported:", summary.errors.len());
        for error in &summary.errors {
            println!("  {error}");
        }
    }
}
