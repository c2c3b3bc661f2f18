//! 🚀 rlx-cli: the front door, the bouncer, the maitre d' of rollup jobs.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config, sets up
//! logging, parses a subcommand, and then lets `RollupClient` do the heavy lifting.
//! Like a manager. 🦆

mod render;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rlx::RollupClient;
use rlx::client::{
    DeleteRollupJobRequest, GetRollupCapsRequest, GetRollupJobRequest, PutRollupJobRequest,
    StartRollupJobRequest, StopRollupJobRequest,
};
use rlx::job_config::RollupJobSpec;
use rlx::app_config::AppConfig;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 🗜️ Manage rollup jobs: create, inspect, start, stop, delete, and read capabilities.
#[derive(Debug, Parser)]
#[command(name = "rlx", version, about)]
struct Cli {
    /// 🔧 TOML config file. Defaults to `rlx.toml` if it exists, env vars (RLX_*) otherwise.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 📦 Print raw JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 📥 Create a job from a JSON file (the same body the engine's PUT takes, plus `id`).
    Create { file: PathBuf },
    /// 🔍 Show one job, or all of them.
    Get { id: Option<String> },
    /// 🏃 Start a stopped job.
    Start { id: String },
    /// 🛑 Stop a job.
    Stop {
        id: String,
        /// ⏳ Wait until the job reports `stopped`.
        #[arg(long)]
        wait: bool,
        /// ⏱️ How long to wait, as a time value (`500ms`, `30s`, `2m`).
        #[arg(long, value_parser = rlx::time_value::parse)]
        timeout: Option<Duration>,
    },
    /// 🗑️ Delete a stopped job.
    Delete { id: String },
    /// 🗺️ Show rollup capabilities for an index pattern, or for all of them.
    Caps { pattern: Option<String> },
}

/// 🔒 An explicit path must exist. The default one is allowed to be missing.
fn resolve_config_file(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let exists = path.try_exists().with_context(|| {
                format!(
                    "💀 Couldn't check whether the configuration file exists. Maybe it's an issue with pwd/cwd and relative paths. In that case, use an absolute path. Was checking here: '{}'",
                    path.display()
                )
            })?;
            if !exists {
                anyhow::bail!(
                    "💀 Configuration file '{}' does not exist. Double check the path, it's usually the path.",
                    path.display()
                );
            }
            Ok(Some(path))
        }
        None => {
            // 🔧 default: the ol' reliable, if it's there
            let default = Path::new("rlx.toml");
            Ok(default.try_exists().unwrap_or(false).then(|| default.to_path_buf()))
        }
    }
}

async fn read_job_spec(file: &Path) -> Result<RollupJobSpec> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("💀 Couldn't read the job file '{}'. Does it exist? Is it readable? Is it a directory in disguise?", file.display()))?;
    serde_json::from_str(&raw).with_context(|| {
        format!(
            "💀 The job file '{}' is not the JSON we hoped for. Expected fields like id, index_pattern, rollup_index, cron, page_size, groups, metrics.",
            file.display()
        )
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .context("💀 Failed to render the response as JSON. serde had a moment.")?;
    println!("{}", rendered);
    Ok(())
}

/// 🫧 Each invocation gets a brand new in-memory engine, so nothing survives to the next one.
fn ephemeral_engine_warning(app_config: &AppConfig) -> Option<&'static str> {
    app_config.engine.is_ephemeral().then_some(
        "⚠️ running against the in-memory engine: jobs live only as long as this command does. \
        Point [engine.Elasticsearch] at a cluster in rlx.toml (or RLX_ENGINE__ELASTICSEARCH__URL) to keep them.",
    )
}

async fn run(cli: Cli) -> Result<()> {
    let config_file = resolve_config_file(cli.config)?;
    let app_config = rlx::app_config::load_config(config_file.as_deref())
        .context("💀 In rlx-cli, main, we couldn't load the config, take a look at the file, make sure it's correct. Make sure you didn't forget something obvious.")?;
    if let Some(warning) = ephemeral_engine_warning(&app_config) {
        warn!("{}", warning);
    }
    let client = RollupClient::from_config(&app_config)
        .await
        .context("💀 Couldn't bring up the rollup engine. The config parsed, but the engine did not answer the door.")?;

    match cli.command {
        Command::Create { file } => {
            let spec = read_job_spec(&file).await?;
            let request = PutRollupJobRequest::from_spec(spec)
                .map_err(rlx::RollupError::from)
                .with_context(|| format!("💀 The job in '{}' did not pass validation", file.display()))?;
            let id = request.config().id().to_string();
            let response = client.put_rollup_job(request).await?;
            info!("✅ rollup job [{}] created", id);
            print_json(&response)?;
        }
        Command::Get { id } => {
            let request = GetRollupJobRequest::new(id.as_deref().unwrap_or("_all"));
            let response = client.get_rollup_job(request).await?;
            if cli.json {
                print_json(&response)?;
            } else {
                println!("{}", render::jobs_table(&response));
            }
        }
        Command::Start { id } => {
            let response = client.start_rollup_job(StartRollupJobRequest::new(id)).await?;
            print_json(&response)?;
        }
        Command::Stop { id, wait, timeout } => {
            let mut request = StopRollupJobRequest::new(id).wait_for_completion(wait);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }
            let response = client.stop_rollup_job(request).await?;
            print_json(&response)?;
        }
        Command::Delete { id } => {
            let response = client.delete_rollup_job(DeleteRollupJobRequest::new(id)).await?;
            print_json(&response)?;
        }
        Command::Caps { pattern } => {
            let request = GetRollupCapsRequest::new(pattern.as_deref().unwrap_or("_all"));
            let response = client.get_rollup_caps(request).await?;
            if cli.json {
                print_json(&response)?;
            } else {
                println!("{}", render::caps_table(&response));
            }
        }
    }
    Ok(())
}

/// 🚀 main(): where it all begins. The "I pressed F5 and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args (clap does the judging)
/// 3. Load config and build the client
/// 4. Run the subcommand
/// 5. Handle errors (cry, but with hints)
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 Set up tracing, because println! debugging is a lifestyle choice we're trying to move past
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;

    if let Err(err) = result {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one tear-jerking layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            // -- 🕵️ sniff the cause like a truffle pig hunting for connection problems
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
                || cause_str.contains("got ghosted")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        // -- 📡 if it smells like a connection problem, it's probably a connection problem
        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like the cluster isn't reachable. \
                Double-check that Elasticsearch is actually running and that the url in \
                [engine.Elasticsearch] points at it. If you're using Docker, try \
                `docker ps` to see what's up, or `docker compose up -d` to resurrect it. ☕"
            );
        }

        // 🗑️ Exit with prejudice. Process exitus maximus.
        std::process::exit(1);
    }

    Ok(())
}
