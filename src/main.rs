//! Database and asset sync tasks for deployed applications
//!
//! Provides CLI interface for copying a database and its uploaded assets
//! between a development machine and the application server

// deploysync/src/main.rs
mod assets;
mod config;
mod database;
mod errors;
mod host;
mod tasks;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use config::DeployConfig;
use host::ssh::SshHost;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tasks::Task;
use utils::prompt::LinePrompt;

#[derive(Debug, Parser)]
#[command(name = "deploysync", version, about = "Sync databases and assets with your application servers")]
struct Cli {
    /// Deploy settings file
    #[arg(long, default_value = "deploy.json")]
    config: PathBuf,

    /// Project directory holding config/database.yml
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Task to run, e.g. db:pull or db:remote:pull
    task: Option<String>,

    /// Source environment for db:remote:pull
    source_env: Option<String>,
}

/// Main entry point for the sync tool
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run_app().await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = DeployConfig::load_from_json(&cli.config, &cli.root)
        .context(format!("Failed to load deploy configuration from {}", cli.config.display()))?;

    let task_name = match cli.task {
        Some(name) => name,
        None => prompt_choice(&mut io::stdin().lock())?,
    };
    let task = Task::from_name(task_name.trim())?;
    let mut prompt = LinePrompt::new(io::stdin().lock(), io::stdout());

    let server = settings.server_for(task.role())?;
    let host = SshHost::new(server)?;

    println!("🚀 Running {} on {}", task.name(), server.host);
    tasks::run_task(task, cli.source_env.as_deref(), &host, &settings, &mut prompt)
        .await
        .with_context(|| format!("Task {} failed", task.name()))
}

/// Prompts user to select a task
///
/// Returns the chosen task name; a menu number is mapped to its task
fn prompt_choice(input: &mut impl BufRead) -> Result<String> {
    println!("Select a task:");
    for (index, task) in Task::ALL.iter().enumerate() {
        println!("{}. {} - {}", index + 1, task.name(), task.description());
    }
    print!("Enter your choice: ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut choice = String::new();
    input.read_line(&mut choice).context("Failed to read user input")?;
    let choice = choice.trim();

    let name = match choice.parse::<usize>() {
        Ok(n) if (1..=Task::ALL.len()).contains(&n) => Task::ALL[n - 1].name().to_string(),
        _ => choice.to_string(),
    };
    Ok(name)
}
