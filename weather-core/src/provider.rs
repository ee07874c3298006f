use crate::{
    ApiError, CityId, Config, WeatherSnapshot, provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

const ICON_HOST: &str = "https://openweathermap.org";

/// Source of current weather. Every call is a fresh request: no caching, no retries.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Look a city up by name. Distinguishes not-found and bad-credential failures.
    async fn fetch_by_name(&self, city_name: &str) -> Result<WeatherSnapshot, ApiError>;

    /// Refresh a city already known by id. Only network failures are told apart.
    async fn fetch_by_id(&self, city_id: CityId) -> Result<WeatherSnapshot, ApiError>;
}

/// Display URL for a condition icon code such as `"04d"`.
pub fn icon_url(icon_code: &str) -> String {
    format!("{ICON_HOST}/img/wn/{icon_code}@2x.png")
}

/// Construct the provider described by `config`.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key()?;

    let provider = OpenWeatherProvider::new(api_key.to_owned())
        .with_base_url(config.base_url())
        .with_language(config.language());

    Ok(Box::new(provider))
}
