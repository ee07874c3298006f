use std::fmt::Write;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use weather_core::{
    CityId, Config, FileStore, Persistence, WeatherStore, config::DEFAULT_BASE_URL,
    provider_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the OpenWeather API key, endpoint and language.
    Configure,

    /// Show current weather for a city and record it in the search history.
    Search {
        /// City name, e.g. "Paris" or "Paris,FR".
        city: String,
    },

    /// Show current weather for a favorite city by its provider id.
    Show {
        id: CityId,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesCommand>,
    },

    /// Refresh weather for every favorite.
    Refresh,

    /// Statistics over favorites and recent searches.
    Stats,

    /// Show recent searches.
    History {
        /// Forget all recent searches instead.
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// List favorites (default).
    List,

    /// Look a city up and add it to favorites.
    Add {
        city: String,
    },

    /// Remove a favorite by its provider id.
    Remove {
        id: CityId,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut out = String::new();

        match self.command {
            Command::Configure => return configure(),
            Command::Search { city } => {
                let mut store = open_store()?;
                store.search_weather(&city).await;
                render_current(&mut out, &store)?;
            }
            Command::Show { id } => {
                let mut store = open_store()?;
                store.load_favorite_weather(id).await;
                render_current(&mut out, &store)?;
            }
            Command::Favorites { action } => {
                let mut store = open_store()?;
                match action.unwrap_or(FavoritesCommand::List) {
                    FavoritesCommand::List => {
                        let state = store.state();
                        render::favorites(&mut out, &state.favorites, &state.favorites_weather)?;
                    }
                    FavoritesCommand::Add { city } => {
                        store.search_weather(&city).await;
                        fail_on_error(&store)?;

                        let name =
                            store.state().current_weather.map(|w| w.name).unwrap_or(city);
                        if store.add_to_favorites() {
                            writeln!(out, "Added {name} to favorites.")?;
                        } else {
                            writeln!(out, "{name} is already a favorite.")?;
                        }
                    }
                    FavoritesCommand::Remove { id } => {
                        let known = store.state().favorites.into_iter().find(|f| f.id == id);
                        store.remove_from_favorites(id);
                        match known {
                            Some(fav) => writeln!(out, "Removed {} from favorites.", fav.name)?,
                            None => writeln!(out, "No favorite with id {id}.")?,
                        }
                    }
                }
            }
            Command::Refresh => {
                let mut store = open_store()?;
                store.refresh_favorites_weather().await;
                let state = store.state();
                render::favorites(&mut out, &state.favorites, &state.favorites_weather)?;
            }
            Command::Stats => {
                let mut store = open_store()?;
                store.refresh_favorites_weather().await;
                render::stats(&mut out, &store.stats())?;
            }
            Command::History { clear } => {
                let mut store = open_store()?;
                if clear {
                    store.clear_history();
                    writeln!(out, "Search history cleared.")?;
                } else {
                    render::history(&mut out, &store.state().search_history)?;
                }
            }
        }

        print!("{out}");
        Ok(())
    }
}

fn open_store() -> Result<WeatherStore> {
    let config = Config::load()?;
    let provider = provider_from_config(&config)?;
    let data_dir = config.data_dir()?;
    tracing::debug!(data_dir = %data_dir.display(), "opening local storage");

    let persistence = Persistence::new(FileStore::new(data_dir));
    Ok(WeatherStore::new(provider, persistence))
}

fn fail_on_error(store: &WeatherStore) -> Result<()> {
    match store.state().error {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

fn render_current(out: &mut String, store: &WeatherStore) -> Result<()> {
    fail_on_error(store)?;

    if let Some(weather) = store.state().current_weather {
        render::snapshot(out, &weather, store.is_current_favorite())?;
    }
    Ok(())
}

fn configure() -> Result<()> {
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    let base_url = Text::new("API base URL:")
        .with_default(config.base_url())
        .prompt()
        .context("Failed to read base URL")?;

    let language = Text::new("Response language:")
        .with_default(config.language())
        .prompt()
        .context("Failed to read language")?;

    config.api_key = Some(api_key.trim().to_string());
    config.base_url = Some(base_url.trim().to_string()).filter(|u| u != DEFAULT_BASE_URL);
    config.language = Some(language.trim().to_string()).filter(|l| !l.is_empty());

    config.save_to(&path)?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}
