use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{CatalogEpisode, EpisodeRef, Show, ShowId};

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn parse_show(value: &Value) -> Option<Show> {
    let id = value.pointer("/ids/trakt")?.as_u64()?;
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("show {id}"));
    let year = value
        .get("year")
        .and_then(Value::as_i64)
        .and_then(|year| i32::try_from(year).ok());
    Some(Show { id, title, year })
}

/// Flattens a `/shows/{id}/seasons?extended=full,episodes` response into the
/// ordinal catalog. Specials (season 0) are dropped, episodes are sorted by
/// `(season, episode)` and air dates after `as_of` are treated as unreleased.
pub(crate) fn normalize_catalog(
    show: ShowId,
    seasons: &Value,
    as_of: DateTime<Utc>,
) -> Vec<CatalogEpisode> {
    let Some(seasons) = seasons.as_array() else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for season in seasons {
        let Some(season_number) = season
            .get("number")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
        else {
            continue;
        };
        if season_number == 0 {
            continue;
        }
        let Some(episodes) = season.get("episodes").and_then(Value::as_array) else {
            continue;
        };
        for episode in episodes {
            let Some(number) = episode
                .get("number")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
            else {
                continue;
            };
            let air_date = episode
                .get("first_aired")
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
                .filter(|aired| *aired <= as_of);
            rows.push((season_number, number, air_date));
        }
    }

    rows.sort_by_key(|(season, episode, _)| (*season, *episode));
    rows.dedup_by_key(|(season, episode, _)| (*season, *episode));

    rows.into_iter()
        .enumerate()
        .map(|(ordinal, (season, episode, air_date))| CatalogEpisode {
            episode: EpisodeRef {
                show,
                season,
                episode,
                ordinal,
            },
            air_date,
        })
        .collect()
}
