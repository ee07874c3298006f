//! Plain-text rendering of store state.

use std::{
    collections::HashMap,
    fmt::{self, Write},
};

use chrono::{DateTime, Local, Utc};
use weather_core::{CityId, FavoriteCity, SearchEntry, WeatherSnapshot, WeatherStats, icon_url};

pub fn snapshot(out: &mut impl Write, w: &WeatherSnapshot, is_favorite: bool) -> fmt::Result {
    let star = if is_favorite { " ★" } else { "" };

    writeln!(out, "{}, {} (id {}){star}", w.name, w.sys.country, w.id)?;

    if let Some(condition) = w.primary_condition() {
        writeln!(out, "  {} ({})", condition.main, condition.description)?;
        writeln!(out, "  icon:        {}", icon_url(&condition.icon))?;
    }

    writeln!(
        out,
        "  temperature: {:.1}°C (feels like {:.1}°C, min {:.1}°C, max {:.1}°C)",
        w.main.temp, w.main.feels_like, w.main.temp_min, w.main.temp_max
    )?;
    writeln!(out, "  humidity:    {}%", w.main.humidity)?;
    writeln!(out, "  pressure:    {} hPa", w.main.pressure)?;
    writeln!(out, "  wind:        {:.1} m/s from {}°", w.wind.speed, w.wind.deg)?;
    writeln!(out, "  clouds:      {}%", w.clouds.all)?;

    if let (Some(rise), Some(set)) = (w.sunrise(), w.sunset()) {
        writeln!(out, "  sun:         {} - {} UTC", rise.format("%H:%M"), set.format("%H:%M"))?;
    }
    if let Some(local) = w.local_observed_at() {
        writeln!(out, "  observed:    {}", local.format("%Y-%m-%d %H:%M %:z"))?;
    }

    Ok(())
}

pub fn favorites(
    out: &mut impl Write,
    favorites: &[FavoriteCity],
    weather: &HashMap<CityId, WeatherSnapshot>,
) -> fmt::Result {
    if favorites.is_empty() {
        return writeln!(out, "No favorites yet. Add one with `weather favorites add <city>`.");
    }

    for fav in favorites {
        let reading = weather
            .get(&fav.id)
            .map(|w| {
                let condition = w.primary_condition().map(|c| c.main.as_str()).unwrap_or("-");
                format!("{:>6.1}°C  {condition}", w.main.temp)
            })
            .unwrap_or_default();
        let place = format!("{}, {}", fav.name, fav.country);

        writeln!(out, "{:>10}  {place:<24} {reading}", fav.id)?;
    }
    Ok(())
}

pub fn history(out: &mut impl Write, entries: &[SearchEntry]) -> fmt::Result {
    if entries.is_empty() {
        return writeln!(out, "No recent searches.");
    }

    for entry in entries {
        writeln!(out, "{}  {}", format_millis(entry.timestamp), entry.city_name)?;
    }
    Ok(())
}

pub fn stats(out: &mut impl Write, stats: &WeatherStats) -> fmt::Result {
    writeln!(out, "Favorites:           {}", stats.total_favorites)?;
    writeln!(out, "Average temperature: {:.1}°C", stats.average_temp)?;

    if !stats.weather_conditions.is_empty() {
        writeln!(out, "Conditions:")?;
        for (condition, count) in &stats.weather_conditions {
            writeln!(out, "  {condition:<14} {count}")?;
        }
    }

    if !stats.recent_searches.is_empty() {
        let names: Vec<_> = stats.recent_searches.iter().map(|e| e.city_name.as_str()).collect();
        writeln!(out, "Recent searches:     {}", names.join(", "))?;
    }

    Ok(())
}

fn format_millis(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown time".to_string())
}
