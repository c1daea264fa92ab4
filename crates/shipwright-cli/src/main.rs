mod cmd_deploy;
mod cmd_repo;
mod cmd_serve;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use shipwright_core::config::Config;
use shipwright_deploy::Orchestrator;
use shipwright_github::GithubClient;
use shipwright_notify::{BackoffPolicy, EvaluatorNotifier};

#[derive(Parser)]
#[command(
    name = "shipwright",
    version,
    about = "Publish task repositories to GitHub Pages and report to an evaluator"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (POST /build-app)
    Serve {
        /// Address to bind (overrides SHIPWRIGHT_BIND)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides SHIPWRIGHT_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one task from a JSON file without the HTTP service
    Deploy {
        /// Path to the task JSON, or `-` for stdin
        task_file: String,
    },
    /// Create a public repository under the configured account
    CreateRepo {
        /// Repository name
        name: String,
        /// Repository description
        #[arg(long, default_value = "")]
        description: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Wire the production client and notifier into an orchestrator.
fn build_orchestrator(config: &Config) -> Arc<Orchestrator> {
    let host = Arc::new(GithubClient::from_config(config));
    let policy = BackoffPolicy::from(&config.notify);
    tracing::debug!(schedule = ?policy.schedule(), "evaluator retry schedule");
    let notifier = Arc::new(EvaluatorNotifier::new(policy));
    Arc::new(Orchestrator::new(host, notifier))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd)?;
    tracing::debug!(?config, "configuration loaded");

    match cli.cmd {
        Command::Serve { bind, port } => cmd_serve::execute(&config, bind, port),
        Command::Deploy { task_file } => cmd_deploy::execute(&config, &task_file),
        Command::CreateRepo { name, description } => {
            cmd_repo::create(&config, &name, &description)
        }
    }
}
