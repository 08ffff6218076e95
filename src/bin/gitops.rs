//! Schema GitOps CLI
//!
//! Usage:
//!   schema-gitops validate state.yaml
//!   schema-gitops --registry http://localhost:8081 plan state.yaml --enable-deletes
//!   schema-gitops apply state.yaml --auto-approve

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use schema_gitops::{render, Applier, GitopsConfig, HttpRegistryClient, Planner, StateLoader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-gitops")]
#[command(about = "Manage schema registry subjects declaratively")]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Registry URL, overrides the config file
    #[arg(short, long, global = true)]
    registry: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a state file and its schemas parse
    Validate {
        /// State file (YAML)
        state: PathBuf,
    },

    /// Show what apply would change
    Plan {
        /// State file (YAML)
        state: PathBuf,
        /// Delete registry subjects missing from the state
        #[arg(long)]
        enable_deletes: bool,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Plan, then execute the plan
    Apply {
        /// State file (YAML)
        state: PathBuf,
        /// Delete registry subjects missing from the state
        #[arg(long)]
        enable_deletes: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = GitopsConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(url) = cli.registry {
        config.registry.url = url;
    }

    match cli.command {
        Commands::Validate { state } => {
            let state = StateLoader::load(&state)?;
            println!("✅ State is valid: {} subjects", state.subjects().len());
            Ok(0)
        }

        Commands::Plan {
            state,
            enable_deletes,
            format,
        } => {
            let state = StateLoader::load(&state)?;
            let client = HttpRegistryClient::new(&config.registry);
            let plan = Planner::new(&client)
                .enable_deletes(enable_deletes || config.plan.enable_deletes)
                .plan(&state)?;

            match format {
                Format::Json => println!("{}", render::json(&plan)?),
                Format::Text => print!("{}", render::text(&plan)),
            }

            // incompatible schemas would fail on apply
            Ok(if plan.incompatible.is_empty() { 0 } else { 2 })
        }

        Commands::Apply {
            state,
            enable_deletes,
            auto_approve,
        } => {
            let state = StateLoader::load(&state)?;
            let client = HttpRegistryClient::new(&config.registry);
            let plan = Planner::new(&client)
                .enable_deletes(enable_deletes || config.plan.enable_deletes)
                .plan(&state)?;

            print!("{}", render::text(&plan));

            if plan.is_empty() && plan.normalize.is_none() {
                return Ok(0);
            }

            // incompatible plans are refused by the applier, no need to ask
            if plan.incompatible.is_empty() && !auto_approve && !confirm(client.base_url())? {
                println!("Apply cancelled.");
                return Ok(1);
            }

            let report = Applier::new(&client)
                .normalize(state.normalize().unwrap_or(false))
                .apply(&plan)?;

            println!(
                "✅ Applied: {} registered, {} compatibility updates, {} settings updates, {} deleted",
                report.registered.len(),
                report.compatibility_updates,
                report.settings_updates,
                report.deleted.len(),
            );
            Ok(0)
        }
    }
}

fn confirm(registry: &str) -> anyhow::Result<bool> {
    print!("\nApply these changes to {}? Only 'yes' is accepted: ", registry);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == "yes")
}
