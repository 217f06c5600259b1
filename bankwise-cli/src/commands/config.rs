use crate::config::ConfigLoader;
use anyhow::Result;
use bankwise_lessons::EngineConfig;
use clap::{Args, Subcommand, ValueEnum};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the merged engine configuration
    Show {
        /// Only print one section
        #[arg(long, value_enum)]
        section: Option<ConfigSection>,
    },
    /// Show configuration file paths
    Path,
}

/// Top-level tables of the engine configuration.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigSection {
    Scoring,
    Grading,
    Telemetry,
    Session,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show { section } => show_config(section),
        ConfigCommands::Path => show_paths(),
    }
}

fn show_config(section: Option<ConfigSection>) -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", render(&config, section)?);
    Ok(())
}

fn render(config: &EngineConfig, section: Option<ConfigSection>) -> Result<String> {
    let rendered = match section {
        None => toml::to_string_pretty(config)?,
        Some(ConfigSection::Scoring) => toml::to_string_pretty(&config.scoring)?,
        Some(ConfigSection::Grading) => toml::to_string_pretty(&config.grading)?,
        Some(ConfigSection::Telemetry) => toml::to_string_pretty(&config.telemetry)?,
        Some(ConfigSection::Session) => toml::to_string_pretty(&config.session)?,
    };
    Ok(rendered)
}

fn show_paths() -> Result<()> {
    println!("User config:    {:?}", ConfigLoader::user_config_path());
    println!("Project config: {:?}", ConfigLoader::project_config_path());
    Ok(())
}
