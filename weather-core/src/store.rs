//! Weather state manager: composes the provider and persistence, and publishes
//! an immutable [`WeatherState`] snapshot to subscribers after every change.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;

use crate::{
    CityId, FavoriteCity, SearchEntry, WeatherSnapshot, WeatherStats,
    persistence::{MAX_HISTORY_ITEMS, Persistence},
    provider::WeatherProvider,
};

pub const EMPTY_CITY_MESSAGE: &str = "Please enter a city name.";

/// Everything a view needs to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherState {
    pub current_weather: Option<WeatherSnapshot>,
    pub favorites: Vec<FavoriteCity>,
    pub search_history: Vec<SearchEntry>,
    /// True only while `search_weather` or `load_favorite_weather` is awaiting the provider.
    pub loading: bool,
    pub error: Option<String>,
    /// Latest weather per favorite; may lack entries whose refresh failed.
    pub favorites_weather: HashMap<CityId, WeatherSnapshot>,
}

impl WeatherState {
    pub fn stats(&self) -> WeatherStats {
        let mut weather_conditions = BTreeMap::new();
        let mut total_temp = 0.0;

        for weather in self.favorites_weather.values() {
            let condition = weather
                .primary_condition()
                .map(|c| c.main.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            *weather_conditions.entry(condition).or_insert(0) += 1;
            total_temp += weather.main.temp;
        }

        let count = self.favorites_weather.len();
        let average_temp = if count > 0 { total_temp / count as f64 } else { 0.0 };

        WeatherStats {
            total_favorites: self.favorites.len(),
            recent_searches: self.search_history.iter().take(MAX_HISTORY_ITEMS).cloned().collect(),
            weather_conditions,
            average_temp,
        }
    }
}

#[derive(Debug)]
pub struct WeatherStore {
    provider: Box<dyn WeatherProvider>,
    persistence: Persistence,
    state: watch::Sender<WeatherState>,
}

impl WeatherStore {
    /// Build the store, seeding favorites and history from storage.
    pub fn new(provider: Box<dyn WeatherProvider>, persistence: Persistence) -> Self {
        let initial = WeatherState {
            favorites: persistence.load_favorites(),
            search_history: persistence.load_search_history(),
            ..WeatherState::default()
        };
        let (state, _) = watch::channel(initial);

        Self { provider, persistence, state }
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<WeatherState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    pub fn state(&self) -> WeatherState {
        self.state.borrow().clone()
    }

    pub fn stats(&self) -> WeatherStats {
        self.state.borrow().stats()
    }

    /// Whether the current snapshot's city is a stored favorite, asked of storage directly.
    pub fn is_current_favorite(&self) -> bool {
        let current_id = self.state.borrow().current_weather.as_ref().map(|w| w.id);
        current_id.is_some_and(|id| self.persistence.is_favorite(id))
    }

    pub async fn search_weather(&mut self, city_name: &str) {
        let city_name = city_name.trim();
        if city_name.is_empty() {
            self.state.send_modify(|s| s.error = Some(EMPTY_CITY_MESSAGE.to_string()));
            return;
        }

        self.begin_loading();

        match self.provider.fetch_by_name(city_name).await {
            Ok(data) => {
                self.persistence.add_search_entry(&data.name);
                let history = self.persistence.load_search_history();
                self.state.send_modify(|s| {
                    s.current_weather = Some(data);
                    s.search_history = history;
                    s.loading = false;
                });
            }
            Err(err) => {
                tracing::debug!(%city_name, ?err, "search failed");
                self.state.send_modify(|s| {
                    s.error = Some(err.to_string());
                    s.current_weather = None;
                    s.loading = false;
                });
            }
        }
    }

    pub async fn load_favorite_weather(&mut self, city_id: CityId) {
        self.begin_loading();

        match self.provider.fetch_by_id(city_id).await {
            Ok(data) => self.state.send_modify(|s| {
                s.favorites_weather.insert(city_id, data.clone());
                s.current_weather = Some(data);
                s.loading = false;
            }),
            Err(err) => {
                tracing::debug!(city_id, ?err, "loading favorite weather failed");
                self.state.send_modify(|s| {
                    s.error = Some(err.to_string());
                    s.loading = false;
                });
            }
        }
    }

    /// Fetch every favorite concurrently. Failures are logged and skipped; the
    /// shared error and loading fields are left alone.
    pub async fn refresh_favorites_weather(&mut self) {
        let favorites = self.state.borrow().favorites.clone();
        let provider = &self.provider;

        let mut pending: FuturesUnordered<_> = favorites
            .iter()
            .map(|fav| async move { (fav, provider.fetch_by_id(fav.id).await) })
            .collect();

        while let Some((fav, result)) = pending.next().await {
            match result {
                Ok(data) => self.state.send_modify(|s| {
                    s.favorites_weather.insert(fav.id, data);
                }),
                Err(err) => tracing::warn!(
                    city = %fav.name,
                    city_id = fav.id,
                    detail = ?err.detail(),
                    "failed to refresh favorite: {err}"
                ),
            }
        }
    }

    /// Bookmark the current city. `false` when there is nothing to add or it is already a favorite.
    pub fn add_to_favorites(&mut self) -> bool {
        let Some(current) = self.state.borrow().current_weather.clone() else {
            return false;
        };

        let favorite = FavoriteCity::from_snapshot(&current, Utc::now());
        let added = self.persistence.add_favorite(favorite);

        if added {
            let favorites = self.persistence.load_favorites();
            self.state.send_modify(|s| {
                s.favorites = favorites;
                s.favorites_weather.insert(current.id, current);
            });
        }
        added
    }

    pub fn remove_from_favorites(&mut self, city_id: CityId) {
        self.persistence.remove_favorite(city_id);
        let favorites = self.persistence.load_favorites();
        self.state.send_modify(|s| {
            s.favorites = favorites;
            s.favorites_weather.remove(&city_id);
        });
    }

    pub fn clear_history(&mut self) {
        self.persistence.clear_search_history();
        self.state.send_modify(|s| s.search_history.clear());
    }

    pub fn clear_error(&mut self) {
        self.state.send_modify(|s| s.error = None);
    }

    fn begin_loading(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }
}
