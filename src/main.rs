use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use i94_mart::{logging, PipelineConfig, RunSummary};

#[derive(Parser)]
#[command(name = "i94-mart")]
#[command(about = "Builds the I94 arrivals analytics mart from the raw extracts")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and publish the fact table
    Run {
        /// Path to the pipeline configuration file
        #[arg(long, default_value = "config/pipeline.toml")]
        config: PathBuf,
        /// Immigration months to include (comma-separated), e.g. "apr,may"
        #[arg(long)]
        months: Option<String>,
        /// Override the configured output path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run every stage through the quality gate without publishing
    Check {
        /// Path to the pipeline configuration file
        #[arg(long, default_value = "config/pipeline.toml")]
        config: PathBuf,
        /// Immigration months to include (comma-separated)
        #[arg(long)]
        months: Option<String>,
    },
}

fn load_config(path: &PathBuf, months: Option<String>) -> anyhow::Result<PipelineConfig> {
    let config = PipelineConfig::load(path)?;
    match months {
        Some(list) => {
            let months = list.split(',').map(|m| m.trim().to_string()).collect();
            Ok(config.with_months(months)?)
        }
        None => Ok(config),
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Pipeline results:");
    println!("   Fact rows: {}", summary.fact_rows);
    println!(
        "   Shape: {} rows x {} columns",
        summary.report.row_count, summary.report.column_count
    );
    println!(
        "   Arrivals dropped by inner joins: {} (over {} keys)",
        summary.report.dropped_arrival_count, summary.report.dropped_key_count
    );
    match &summary.output_path {
        Some(path) => println!(
            "   Published: {} partition files at {}",
            summary.partition_files,
            path.display()
        ),
        None => println!("   Published: no"),
    }

    if !summary.report.issues.is_empty() {
        println!("\n⚠️  Quality gate issues:");
        for issue in &summary.report.issues {
            println!("   - {}", issue.description);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let (config, publish) = match cli.command {
        Commands::Run {
            config,
            months,
            out,
        } => {
            let mut config = load_config(&config, months)?;
            if let Some(out) = out {
                config.output.path = out;
            }
            (config, true)
        }
        Commands::Check { config, months } => (load_config(&config, months)?, false),
    };

    match i94_mart::run(&config, publish).await {
        Ok(summary) => {
            print_summary(&summary);
            if publish && !summary.published {
                // Quality gate withheld the run; signal it to the caller.
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            error!("pipeline failed: {:#}", e);
            Err(e)
        }
    }
}
