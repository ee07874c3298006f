use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Numeric city id assigned by the weather provider.
pub type CityId = u64;

/// Current weather for one city, in the provider's JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub id: CityId,
    pub name: String,
    pub sys: SunInfo,
    pub main: Measurements,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub wind: Wind,
    #[serde(default)]
    pub clouds: Clouds,
    pub dt: i64,
    /// Shift in seconds from UTC.
    #[serde(default)]
    pub timezone: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunInfo {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default)]
    pub deg: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    pub all: u8,
}

impl WeatherSnapshot {
    /// First condition record; the provider lists the dominant one first.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.dt, 0)
    }

    /// Observation time expressed in the city's own offset.
    pub fn local_observed_at(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.timezone)?;
        self.observed_at().map(|t| t.with_timezone(&offset))
    }

    pub fn sunrise(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sys.sunrise, 0)
    }

    pub fn sunset(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sys.sunset, 0)
    }
}

/// A bookmarked city. `id` is unique within the stored collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteCity {
    pub id: CityId,
    pub name: String,
    pub country: String,
    /// Milliseconds since the Unix epoch.
    pub added_at: i64,
}

impl FavoriteCity {
    pub fn from_snapshot(snapshot: &WeatherSnapshot, added_at: DateTime<Utc>) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name.clone(),
            country: snapshot.sys.country.clone(),
            added_at: added_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub city_name: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Aggregates derived from favorites, history and the favorite weather cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherStats {
    pub total_favorites: usize,
    pub recent_searches: Vec<SearchEntry>,
    /// Condition category (e.g. "Clouds") to the number of cached favorites showing it.
    pub weather_conditions: BTreeMap<String, usize>,
    pub average_temp: f64,
}
