use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{
    ApiError, CityId, WeatherSnapshot,
    config::{DEFAULT_BASE_URL, DEFAULT_LANGUAGE},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    language: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// GET `/weather` with one lookup parameter plus the fixed ones.
    ///
    /// Only a missing response is reported here (as `Network`); status handling
    /// is left to the caller.
    async fn fetch_current(&self, lookup: (&str, &str)) -> Result<(StatusCode, String), ApiError> {
        let url = format!("{}/weather", self.base_url);

        tracing::debug!(%url, param = lookup.0, value = lookup.1, "requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(&[
                lookup,
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("request to OpenWeather failed: {e}")))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            ApiError::Unknown(format!("failed to read OpenWeather response body: {e}"))
        })?;

        Ok((status, body))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_by_name(&self, city_name: &str) -> Result<WeatherSnapshot, ApiError> {
        let (status, body) = self.fetch_current(("q", city_name)).await?;

        match status {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            StatusCode::UNAUTHORIZED => Err(ApiError::Configuration),
            s if !s.is_success() => Err(unexpected_status(s, &body)),
            _ => parse_snapshot(&body),
        }
    }

    async fn fetch_by_id(&self, city_id: CityId) -> Result<WeatherSnapshot, ApiError> {
        let id = city_id.to_string();
        let (status, body) = self.fetch_current(("id", id.as_str())).await?;

        if !status.is_success() {
            return Err(unexpected_status(status, &body));
        }
        parse_snapshot(&body)
    }
}

fn parse_snapshot(body: &str) -> Result<WeatherSnapshot, ApiError> {
    serde_json::from_str(body)
        .map_err(|e| ApiError::Unknown(format!("failed to parse OpenWeather JSON: {e}")))
}

fn unexpected_status(status: StatusCode, body: &str) -> ApiError {
    ApiError::Unknown(format!(
        "OpenWeather request failed with status {}: {}",
        status,
        truncate_body(body)
    ))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
