//! CLI entrypoint for the memstream scenario harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memstream_harness::structured_log::{LogEmitter, validate_log_file};
use memstream_harness::{FixtureSet, ScenarioRunner};

/// Scenario tooling for memstream.
#[derive(Debug, Parser)]
#[command(name = "memstream-harness")]
#[command(about = "Scenario harness for memory and string streams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute a scenario fixture set.
    Run {
        /// Fixture JSON path.
        #[arg(long)]
        fixture: PathBuf,
        /// Write structured JSONL logs to this path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Write an artifact index of final buffer digests to this path.
        #[arg(long)]
        artifact_index: Option<PathBuf>,
        /// Campaign name used in trace ids.
        #[arg(long, default_value = "memstream")]
        campaign: String,
        /// Run identifier used in trace ids.
        #[arg(long, default_value = "run-1")]
        run_id: String,
    },
    /// Validate a structured JSONL log.
    ValidateLog {
        /// JSONL log path.
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            fixture,
            log,
            artifact_index,
            campaign,
            run_id,
        } => {
            let set = FixtureSet::from_file(&fixture)?;
            eprintln!(
                "Running {} scenario(s) from {}",
                set.scenarios.len(),
                fixture.display()
            );

            let runner = ScenarioRunner::new(&campaign, &run_id);
            let summary = match &log {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    let mut emitter = LogEmitter::to_file(path, &campaign, &run_id)?;
                    runner.run_logged(&set, &mut emitter)?
                }
                None => runner.run(&set),
            };

            for result in &summary.results {
                let status = if result.passed { "PASS" } else { "FAIL" };
                println!("{status} [{}] {}", result.backend.as_str(), result.name);
                for failure in &result.failures {
                    println!("    {failure}");
                }
            }
            println!(
                "total={} passed={} failed={}",
                summary.total, summary.passed, summary.failed
            );

            if let Some(path) = artifact_index {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, runner.artifact_index(&summary).to_json()?)?;
                eprintln!("Artifact index written to {}", path.display());
            }

            if !summary.all_passed() {
                return Err(format!("{} scenario(s) failed", summary.failed).into());
            }
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            println!("lines={lines} errors={}", errors.len());
            if !errors.is_empty() {
                return Err(format!("{} invalid log field(s)", errors.len()).into());
            }
        }
    }

    Ok(())
}
