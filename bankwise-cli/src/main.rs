use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod renderer;
mod scenario;

#[derive(Parser)]
#[command(name = "bankwise", about = "Lesson engine tools for the bankwise banking simulator")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Look up the letter grade for a score
    Grade(commands::grade::GradeArgs),
    /// Work with lesson catalogs
    Lessons(commands::lessons::LessonsArgs),
    /// Replay a scripted scenario through the lesson engine
    Replay(commands::replay::ReplayArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Grade(args) => commands::grade::run(args),
        Commands::Lessons(args) => commands::lessons::run(args),
        Commands::Replay(args) => commands::replay::run(args).await,
    }
}
