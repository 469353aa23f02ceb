use std::{fmt::Display, sync::Arc};

use anyhow::{Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use meteoblue_core::{
    Config, IpLocator, LocationProvider, MeteoblueClient, Presenter, StaticLocator,
    ViewStateController, WeatherClient,
    units::{PrecipitationUnit, TemperatureUnit, WindspeedUnit},
};

use crate::{
    render,
    session::{Session, Start, optional},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteoblue", version, about = "meteoblue weather forecasts in the terminal")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). Logs go to stderr.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key and unit preferences.
    Configure {
        /// Store this key without prompting for it.
        #[arg(long)]
        api_key: Option<String>,

        /// Temperature unit: C or F.
        #[arg(long)]
        temperature: Option<String>,

        /// Wind speed unit: kmh, mph, ms or kn.
        #[arg(long)]
        windspeed: Option<String>,

        /// Precipitation unit: mm or inch.
        #[arg(long)]
        precipitation: Option<String>,
    },

    /// Print the locations matching a query.
    Search {
        /// City or place name.
        query: String,
    },

    /// Interactive forecast browser (the default command).
    Show {
        /// Start by searching for this place.
        query: Option<String>,

        /// Start with the forecast for the current location.
        #[arg(long, conflicts_with_all = ["query", "lat"])]
        here: bool,

        /// Start with the forecast for this latitude.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Elevation in metres, used for temperature correction.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        elevation: Option<f64>,
    },

    /// Print where the configuration file lives.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let command = self.command.unwrap_or(Command::Show {
            query: None,
            here: false,
            lat: None,
            lon: None,
            elevation: None,
        });

        match command {
            Command::Configure {
                api_key,
                temperature,
                windspeed,
                precipitation,
            } => configure(
                api_key,
                UnitFlags {
                    temperature: unit_flag(temperature.as_deref())?,
                    windspeed: unit_flag(windspeed.as_deref())?,
                    precipitation: unit_flag(precipitation.as_deref())?,
                },
            ),
            Command::Search { query } => search(&query).await,
            Command::Show {
                query,
                here,
                lat,
                lon,
                elevation,
            } => {
                let start = match (query, lat.zip(lon)) {
                    (_, Some((lat, lon))) => Start::Point {
                        lat,
                        lon,
                        elevation,
                    },
                    _ if here => Start::CurrentLocation,
                    (Some(query), None) => Start::Query(query),
                    (None, None) => Start::Prompt,
                };
                show(start).await
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

/// `[home]` from the config stands in for the current location when present.
fn locator_for(config: &Config) -> Arc<dyn LocationProvider> {
    match config.home {
        Some(home) => Arc::new(StaticLocator::new(home.into())),
        None => Arc::new(IpLocator::from_config(config)),
    }
}

fn controller(config: &Config) -> ViewStateController {
    let client: Arc<dyn WeatherClient> = Arc::new(MeteoblueClient::from_config(config));
    ViewStateController::new(config, client, locator_for(config))
}

async fn show(start: Start) -> Result<()> {
    let config = Config::load()?;
    let session = Session::new(controller(&config), Presenter::new(config.units));
    session.run(start).await
}

async fn search(query: &str) -> Result<()> {
    let config = Config::load()?;
    if !config.has_api_key() {
        render::api_key_missing(meteoblue_core::controller::API_KEY_MISSING);
        return Ok(());
    }

    let mut ctl = controller(&config);
    ctl.search(query);
    ctl.settle().await;

    if let Some(err) = ctl.error() {
        bail!("{err}");
    }
    render::search(query, ctl.results(), None);
    Ok(())
}

/// Units given on the command line; each one skips its prompt.
#[derive(Debug, Default)]
struct UnitFlags {
    temperature: Option<TemperatureUnit>,
    windspeed: Option<WindspeedUnit>,
    precipitation: Option<PrecipitationUnit>,
}

fn unit_flag<T>(raw: Option<&str>) -> Result<Option<T>>
where
    T: for<'a> TryFrom<&'a str, Error = anyhow::Error>,
{
    raw.map(T::try_from).transpose()
}

fn configure(api_key: Option<String>, flags: UnitFlags) -> Result<()> {
    let path = Config::config_file_path()?;
    // Read the file directly: the env override must not end up on disk.
    let mut config = Config::load_from(&path)?;

    let api_key = match api_key {
        Some(key) => Some(key),
        None => optional(
            Password::new("meteoblue API key:")
                .without_confirmation()
                .with_display_mode(PasswordDisplayMode::Masked)
                .with_help_message(if config.has_api_key() {
                    "leave empty to keep the current key"
                } else {
                    "get one at https://www.meteoblue.com/en/weather-api"
                })
                .prompt(),
        )?,
    };
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        config.set_api_key(key);
    }

    let Some(temperature) = (match flags.temperature {
        Some(unit) => Some(unit),
        None => pick_unit(
            "Temperature unit:",
            TemperatureUnit::all(),
            config.units.temperature,
        )?,
    }) else {
        return Ok(());
    };
    let Some(windspeed) = (match flags.windspeed {
        Some(unit) => Some(unit),
        None => pick_unit(
            "Wind speed unit:",
            WindspeedUnit::all(),
            config.units.windspeed,
        )?,
    }) else {
        return Ok(());
    };
    let Some(precipitation) = (match flags.precipitation {
        Some(unit) => Some(unit),
        None => pick_unit(
            "Precipitation unit:",
            PrecipitationUnit::all(),
            config.units.precipitation,
        )?,
    }) else {
        return Ok(());
    };

    config.units.temperature = temperature;
    config.units.windspeed = windspeed;
    config.units.precipitation = precipitation;

    config.save()?;
    tracing::info!(path = %path.display(), "configuration saved");
    println!("Saved configuration to {}", path.display());
    Ok(())
}

/// `None` when the prompt was cancelled.
fn pick_unit<T>(message: &str, all: &[T], current: T) -> Result<Option<T>>
where
    T: Copy + PartialEq + Display,
{
    let cursor = all.iter().position(|u| *u == current).unwrap_or(0);
    optional(
        Select::new(message, all.to_vec())
            .with_starting_cursor(cursor)
            .prompt(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_interactive_show() {
        let cli = Cli::try_parse_from(["meteoblue"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn coordinates_must_come_in_pairs() {
        assert!(Cli::try_parse_from(["meteoblue", "show", "--lat", "47.5"]).is_err());

        let cli = Cli::try_parse_from([
            "meteoblue", "show", "--lat", "-33.9", "--lon", "18.4", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Command::Show { lat, lon, .. }) => {
                assert_eq!(lat, Some(-33.9));
                assert_eq!(lon, Some(18.4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unit_flags_parse_case_insensitively() {
        assert_eq!(
            unit_flag::<TemperatureUnit>(Some("f")).unwrap(),
            Some(TemperatureUnit::Fahrenheit)
        );
        assert_eq!(
            unit_flag::<WindspeedUnit>(Some("KN")).unwrap(),
            Some(WindspeedUnit::Kn)
        );
        assert_eq!(unit_flag::<PrecipitationUnit>(None).unwrap(), None);

        let err = unit_flag::<PrecipitationUnit>(Some("furlong")).unwrap_err();
        assert!(err.to_string().contains("Supported units: mm, inch"));
    }

    #[test]
    fn here_conflicts_with_query() {
        assert!(Cli::try_parse_from(["meteoblue", "show", "Basel", "--here"]).is_err());
    }

    #[test]
    fn home_config_selects_static_locator() {
        let mut config = Config::default();
        assert!(format!("{:?}", locator_for(&config)).starts_with("IpLocator"));

        config.home = Some(meteoblue_core::config::HomeConfig {
            latitude: 47.56,
            longitude: 7.57,
            elevation: None,
        });
        assert!(format!("{:?}", locator_for(&config)).starts_with("StaticLocator"));
    }
}
