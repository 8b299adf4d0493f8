//! `agro`: query AgroConnect providers from the command line.

use std::path::PathBuf;
use std::process::ExitCode;

use agro::{AgroConfig, AgroError, AgroServices, ApiResponse, SchemeFilters};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

const DEFAULT_STATE: &str = "maharashtra";

/// AgroConnect market, weather and scheme data
#[derive(Debug, Parser)]
#[command(name = "agro", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "AGRO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Current price of one crop.
    Price {
        /// Crop name, e.g. onion.
        crop: String,
        #[command(flatten)]
        state: StateArg,
    },
    /// Prices of every tracked crop.
    Prices {
        #[command(flatten)]
        state: StateArg,
    },
    /// Best crops to sell right now.
    Recommend {
        #[command(flatten)]
        state: StateArg,
    },
    /// Weather for a location.
    #[command(subcommand)]
    Weather(WeatherCommand),
    /// Government schemes.
    #[command(subcommand)]
    Schemes(SchemesCommand),
}

#[derive(Debug, Subcommand)]
enum WeatherCommand {
    /// Current conditions.
    Current {
        /// City or place name.
        location: String,
    },
    /// Five-day forecast, one entry per day.
    Forecast {
        /// City or place name.
        location: String,
    },
    /// Current conditions with farming advisories.
    Advisory {
        /// City or place name.
        location: String,
    },
}

#[derive(Debug, Subcommand)]
enum SchemesCommand {
    /// Schemes matching every given filter.
    List {
        #[command(flatten)]
        state: StateArg,
        /// Crop covered by the scheme (substring match).
        #[arg(long)]
        crop: Option<String>,
        /// Farmer category, or `all`.
        #[arg(long)]
        farmer_type: Option<String>,
        /// Scheme category.
        #[arg(long)]
        category: Option<String>,
    },
    /// One scheme by id.
    Get {
        /// Scheme id, e.g. pm-kisan.
        id: String,
        #[command(flatten)]
        state: StateArg,
    },
    /// Every scheme category.
    Categories,
}

#[derive(Debug, Args)]
struct StateArg {
    /// State to query.
    #[arg(long, default_value = DEFAULT_STATE)]
    state: String,
}

fn to_json<T: Serialize>(value: T) -> agro::Result<Value> {
    serde_json::to_value(value).map_err(|e| AgroError::Other(e.to_string()))
}

async fn execute(command: Command, services: &AgroServices) -> agro::Result<Value> {
    debug!(?command, "Executing");
    match command {
        Command::Price { crop, state } => {
            to_json(services.market().get_price(&crop, &state.state).await?)
        }
        Command::Prices { state } => to_json(services.market().get_all_prices(&state.state).await),
        Command::Recommend { state } => {
            to_json(services.market().get_recommendations(&state.state).await)
        }
        Command::Weather(WeatherCommand::Current { location }) => {
            to_json(services.weather().get_current(&location).await?)
        }
        Command::Weather(WeatherCommand::Forecast { location }) => {
            to_json(services.weather().get_forecast(&location).await?)
        }
        Command::Weather(WeatherCommand::Advisory { location }) => {
            to_json(services.weather().advisory(&location).await?)
        }
        Command::Schemes(SchemesCommand::List {
            state,
            crop,
            farmer_type,
            category,
        }) => {
            let filters = SchemeFilters {
                crop,
                farmer_type,
                category,
            };
            to_json(services.schemes().list_schemes(&state.state, &filters).await?)
        }
        Command::Schemes(SchemesCommand::Get { id, state }) => {
            to_json(services.schemes().get_scheme(&id, &state.state)?)
        }
        Command::Schemes(SchemesCommand::Categories) => {
            to_json(services.schemes().list_categories())
        }
    }
}

async fn run(cli: Cli) -> agro::Result<Value> {
    let config = AgroConfig::load(cli.config.as_deref())?;
    let services = AgroServices::from_config(&config)?;
    execute(cli.command, &services).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(e) = &result {
        error!(status = e.status_code(), "{e}");
    }

    let success = result.is_ok();
    match serde_json::to_string_pretty(&ApiResponse::from(result)) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            error!("Failed to encode response: {e}");
            return ExitCode::FAILURE;
        }
    }

    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
