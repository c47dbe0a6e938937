// Copyright 2025 AgentReplay (https://github.com/agentreplay)
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

//! Memeval CLI
//!
//! Command-line driver for clustering, evaluating and reporting on a
//! conversational memory backend.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memeval_core::{load_dataset, Cluster, HarnessConfig};
use memeval_evals::{render_table, ClusterOutcome, ClusteringSummary, Harness};
use memeval_storage::ResultsStore;
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "memeval")]
#[command(about = "Memeval - offline evaluation of conversational memory", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

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
    /// Classify dataset records into memory-test clusters
    Cluster {
        /// Dataset files (JSON), concatenated in order
        #[arg(required = true)]
        datasets: Vec<PathBuf>,
    },

    /// Evaluate every non-empty cluster in the clustered dataset
    Evaluate {
        /// Restrict to these clusters (repeatable)
        #[arg(long)]
        cluster: Vec<Cluster>,
    },

    /// Cluster the datasets, then evaluate every cluster
    Run {
        /// Dataset files (JSON), concatenated in order
        #[arg(required = true)]
        datasets: Vec<PathBuf>,
    },

    /// Print the stored per-cluster results
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = HarnessConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Report => {
            // Reporting only reads the results file
            let results = ResultsStore::open(&config.storage.results_path)
                .load()
                .context("Failed to read evaluation results")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print!("{}", render_table(&results));
            }
        }

        Commands::Cluster { datasets } => {
            let harness = build_harness(&config)?;
            let summary = run_clustering(&harness, &datasets).await?;
            print_clustering(&summary, cli.json)?;
        }

        Commands::Evaluate { cluster } => {
            let harness = build_harness(&config)?;
            let outcomes = harness
                .evaluate_all(&cluster)
                .await
                .context("Evaluation failed")?;
            print_outcomes(&outcomes, cli.json)?;
        }

        Commands::Run { datasets } => {
            let harness = build_harness(&config)?;
            let summary = run_clustering(&harness, &datasets).await?;
            if !cli.json {
                print_clustering(&summary, false)?;
            }
            let outcomes = harness
                .evaluate_all(&[])
                .await
                .context("Evaluation failed")?;
            if cli.json {
                let output = serde_json::json!({
                    "clustering": summary,
                    "evaluation": outcomes,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_outcomes(&outcomes, false)?;
            }
        }
    }

    Ok(())
}

fn build_harness(config: &HarnessConfig) -> Result<Harness> {
    Harness::from_config(config).context("Failed to set up harness")
}

async fn run_clustering(harness: &Harness, datasets: &[PathBuf]) -> Result<ClusteringSummary> {
    let records = load_dataset(datasets).context("Failed to load dataset")?;
    info!("Loaded {} records", records.len());
    harness
        .cluster(&records)
        .await
        .context("Clustering failed")
}

fn print_clustering(summary: &ClusteringSummary, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!(
        "✓ Clustered {} records ({} matched no cluster, {} failed)",
        summary.processed,
        summary.dropped,
        summary.failures.len()
    );
    for (cluster, count) in &summary.appended {
        println!("  {}: {}", cluster, count);
    }
    for failure in &summary.failures {
        println!("  ✗ record {}: {}", failure.index + 1, failure.message);
    }
    Ok(())
}

fn print_outcomes(outcomes: &[ClusterOutcome], json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(outcomes)?);
        return Ok(());
    }

    if outcomes.is_empty() {
        println!("No clusters to evaluate");
        return Ok(());
    }

    for outcome in outcomes {
        println!(
            "✓ {}: {} scored, {} failed",
            outcome.cluster(),
            outcome.scored,
            outcome.failures.len()
        );
        for failure in &outcome.failures {
            println!(
                "  ✗ record {} ({}): {}",
                failure.index + 1,
                failure.class,
                failure.message
            );
        }
    }

    let aggregates: Vec<_> = outcomes.iter().map(|o| o.aggregate.clone()).collect();
    println!();
    print!("{}", render_table(&aggregates));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_parses_without_datasets() {
        let cli = Cli::try_parse_from(["memeval", "--json", "report"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Report));
    }

    #[test]
    fn test_evaluate_cluster_filter_parses_names() {
        let cli = Cli::try_parse_from([
            "memeval",
            "evaluate",
            "--cluster",
            "Plans_and_Goals",
            "--cluster",
            "locations_and_places",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate { cluster } => assert_eq!(
                cluster,
                vec![Cluster::PlansAndGoals, Cluster::LocationsAndPlaces]
            ),
            _ => panic!("expected evaluate"),
        }
        assert!(Cli::try_parse_from(["memeval", "evaluate", "--cluster", "Nope"]).is_err());
    }
}
