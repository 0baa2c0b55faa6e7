//! Command-line runner for the built-in suites.
//!
//! ```bash
//! $ litmus list
//! $ litmus run spellcheck-paste --latency-ms 20 --json out/summary.json
//! $ litmus run frame-timestamps --config runner.yaml
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use litmus_core::{RecordingReporter, RunnerConfig};
use litmus_fixtures::{HostOptions, Suite, SuiteKind};

#[derive(Parser, Debug)]
#[command(name = "litmus", version, about = "Run sequential async test suites")]
struct Cli {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Run one suite and print its report
    Run {
        /// Suite name, see `litmus list`
        suite: String,

        /// Runner config file (YAML, or JSON with a .json extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the run summary as JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,

        /// Background spellchecker latency in milliseconds
        #[arg(long)]
        latency_ms: Option<u64>,
    },

    /// List the available suites and their steps
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.action {
        Action::List => {
            for kind in SuiteKind::ALL {
                println!("{:<18} {}", kind.name(), kind.description());
                for name in Suite::build(kind, HostOptions::default()).step_names() {
                    println!("    {}", name);
                }
            }
            Ok(())
        }
        Action::Run {
            suite,
            config,
            json,
            latency_ms,
        } => {
            let kind: SuiteKind = suite.parse()?;
            let config = match config {
                Some(path) => RunnerConfig::from_file(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => RunnerConfig::default(),
            };

            let mut options = HostOptions::default();
            if let Some(ms) = latency_ms {
                options.spellcheck_latency = Duration::from_millis(ms);
            }

            let reporter = RecordingReporter::new();
            let run = Suite::build(kind, options)
                .run(Arc::new(reporter.clone()), config)
                .await;
            print!("{}", reporter.render(run.controller.done_calls() > 0));

            if let Some(path) = json {
                run.summary
                    .write_json(&path)
                    .await
                    .with_context(|| format!("writing summary {}", path.display()))?;
            }

            if !run.summary.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
