use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use fastweather_core::{
    Config, ProviderId, WeatherError, WeatherQuery, WeatherReport, WeatherService,
};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use std::io::{IsTerminal, Write};

use crate::display::{FETCH_FAILED_MESSAGE, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "fastweather", version, about = "Current weather from whichever provider answers first")]
pub struct Cli {
    /// Log cache and provider activity to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "weatherapi".
        provider: String,
    },

    /// Show current weather for a city.
    Show {
        /// City or place name.
        city: String,

        /// Print the normalized report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Prompt for cities repeatedly; repeated lookups are served from cache.
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show { city, json } => {
                let query = WeatherQuery::new(&city)?;
                let service = service_from_config()?;

                match lookup(&service, &query).await {
                    Ok(report) if json => {
                        let out = serde_json::to_string_pretty(&report)
                            .context("Failed to serialize report")?;
                        println!("{out}");
                        Ok(())
                    }
                    Ok(report) => {
                        println!("{}", render(&report));
                        Ok(())
                    }
                    Err(_) => bail!(FETCH_FAILED_MESSAGE),
                }
            }
            Command::Interactive => interactive(&service_from_config()?).await,
        }
    }
}

fn service_from_config() -> anyhow::Result<WeatherService> {
    let config = Config::load()?;
    let service = WeatherService::from_config(&config)?;

    let names: Vec<&str> = service.providers().map(|p| p.id().as_str()).collect();
    tracing::debug!(providers = ?names, "weather service ready");

    Ok(service)
}

/// Run one lookup with a progress line on stderr while it is outstanding.
async fn lookup(service: &WeatherService, query: &WeatherQuery) -> Result<WeatherReport, WeatherError> {
    let show_progress = std::io::stderr().is_terminal();
    if show_progress {
        eprint!("Fetching weather for {query}...");
        let _ = std::io::stderr().flush();
    }

    let result = service.get_weather(query).await;

    if show_progress {
        // clear the progress line
        eprint!("\r\x1b[2K");
    }
    result
}

async fn interactive(service: &WeatherService) -> anyhow::Result<()> {
    println!("Enter a city name (Esc or Ctrl-C to quit).");

    loop {
        let input = match Text::new("City:").prompt() {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e).context("Failed to read city name"),
        };

        let query = match WeatherQuery::new(&input) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match lookup(service, &query).await {
            Ok(report) => println!("{}\n", render(&report)),
            Err(_) => eprintln!("{FETCH_FAILED_MESSAGE}\n"),
        }
    }

    Ok(())
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;

    if !id.requires_api_key() {
        println!("Provider '{id}' needs no configuration.");
        return Ok(());
    }

    // read the file directly so an environment override is not persisted
    let mut config = Config::load_from(&Config::config_file_path()?)?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key.to_string());
    let path = config.save()?;

    println!("Saved {id} credentials to {}", path.display());
    Ok(())
}
