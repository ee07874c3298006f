//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client behind the [`WeatherProvider`] abstraction
//! - Key-value storage and the favorites / search history persistence on top of it
//! - [`WeatherStore`], the state manager tying these together
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod persistence;
pub mod provider;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{ApiError, StorageError};
pub use model::{CityId, FavoriteCity, SearchEntry, WeatherSnapshot, WeatherStats};
pub use persistence::Persistence;
pub use provider::{WeatherProvider, icon_url, provider_from_config};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{WeatherState, WeatherStore};
