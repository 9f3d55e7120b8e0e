//! mixkit - run mixin scenario files

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mixkit::scenario::Scenario;
use mixkit::{CompositionRegistry, MixConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mixin composition scenario runner
#[derive(Parser, Debug)]
#[command(name = "mixkit", version, about = "Run mixin composition scenarios")]
struct Args {
    /// TOML configuration file for the registry
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and check its expectations
    Run {
        /// Scenario file (.toml or .json)
        scenario: PathBuf,
    },
    /// Run a scenario, then print every key visible on an object
    Keys {
        /// Scenario file (.toml or .json)
        scenario: PathBuf,
        /// Object name from the scenario (or "root")
        object: String,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mixkit=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.json);

    let config = MixConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let registry = CompositionRegistry::install(config)
        .map_err(|_| anyhow::anyhow!("registry already initialized"))?;

    match args.command {
        Command::Run { scenario } => {
            let loaded = Scenario::load(&scenario)
                .with_context(|| format!("failed to load {}", scenario.display()))?;
            let (_, report) = loaded.run(registry)?;

            for e in &report.expectations {
                let status = if e.passed() { "ok" } else { "FAILED" };
                println!(
                    "step {:>3} {}.{}: {} (expected {}, got {})",
                    e.step,
                    e.target,
                    e.key,
                    status,
                    show(&e.expected),
                    show(&e.actual)
                );
            }

            let failed = report.failures().count();
            info!(
                "{} steps, {} expectations, {} failed",
                report.steps_run,
                report.expectations.len(),
                failed
            );
            if failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Keys { scenario, object } => {
            let loaded = Scenario::load(&scenario)
                .with_context(|| format!("failed to load {}", scenario.display()))?;
            let (world, _) = loaded.run(registry)?;

            let handle = world.get(&object).with_context(|| {
                format!(
                    "no object named {} (known: {})",
                    object,
                    world.names().collect::<Vec<_>>().join(", ")
                )
            })?;

            for key in registry.keys(handle) {
                println!("{} = {}", key, show(&registry.get(handle, &key)));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn show(value: &Option<serde_json::Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<not found>".to_string(),
    }
}
