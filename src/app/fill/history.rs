use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::catalog::{parse_show, parse_timestamp};
use super::{EpisodeKey, Show, ShowId, WatchEvent, record_earliest};

/// Per-show map of `(season, episode)` to the earliest observed watch time.
#[derive(Debug, Default, Clone)]
pub(crate) struct WatchIndex {
    by_show: HashMap<ShowId, BTreeMap<EpisodeKey, DateTime<Utc>>>,
    pub(crate) skipped: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct WatchedShow {
    pub(crate) show: Show,
    /// One event per watched episode, stamped with its `last_watched_at`.
    pub(crate) events: Vec<WatchEvent>,
}

impl WatchIndex {
    #[cfg(test)]
    pub(crate) fn from_history(entries: &Value) -> Self {
        let mut index = Self::default();
        index.extend_history(entries);
        index
    }

    /// Adds one page of `/users/{user}/history/shows`. Returns the number of
    /// entries in the page, including skipped ones.
    pub(crate) fn extend_history(&mut self, entries: &Value) -> usize {
        let Some(entries) = entries.as_array() else {
            return 0;
        };
        for entry in entries {
            match parse_history_entry(entry) {
                Some(event) => self.insert(event),
                None => self.skipped += 1,
            }
        }
        entries.len()
    }

    pub(crate) fn insert(&mut self, event: WatchEvent) {
        let show = self.by_show.entry(event.show).or_default();
        record_earliest(show, (event.season, event.episode), event.watched_at);
    }

    /// Adds events only for episodes the history has nothing for.
    pub(crate) fn fill_missing(&mut self, events: &[WatchEvent]) -> usize {
        let mut added = 0;
        for event in events {
            let show = self.by_show.entry(event.show).or_default();
            let key = (event.season, event.episode);
            if !show.contains_key(&key) {
                show.insert(key, event.watched_at);
                added += 1;
            }
        }
        added
    }

    pub(crate) fn events_for(&self, show: ShowId) -> Vec<WatchEvent> {
        self.by_show
            .get(&show)
            .map(|episodes| {
                episodes
                    .iter()
                    .map(|(&(season, episode), &watched_at)| WatchEvent {
                        show,
                        season,
                        episode,
                        watched_at,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_show.values().map(BTreeMap::len).sum()
    }
}

fn parse_u32(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn parse_history_entry(entry: &Value) -> Option<WatchEvent> {
    let show = entry.pointer("/show/ids/trakt")?.as_u64()?;
    let episode = entry.get("episode")?;
    Some(WatchEvent {
        show,
        season: parse_u32(episode.get("season"))?,
        episode: parse_u32(episode.get("number"))?,
        watched_at: parse_timestamp(entry.get("watched_at")?.as_str()?)?,
    })
}

/// Parses `/users/{user}/watched/shows`.
pub(crate) fn parse_watched_shows(value: &Value) -> Vec<WatchedShow> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let show = parse_show(item.get("show")?)?;
            let mut events = Vec::new();
            let seasons = item
                .get("seasons")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for season in seasons {
                let Some(season_number) = parse_u32(season.get("number")) else {
                    continue;
                };
                let episodes = season
                    .get("episodes")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for episode in episodes {
                    let Some(number) = parse_u32(episode.get("number")) else {
                        continue;
                    };
                    let Some(watched_at) = episode
                        .get("last_watched_at")
                        .and_then(Value::as_str)
                        .and_then(parse_timestamp)
                    else {
                        continue;
                    };
                    events.push(WatchEvent {
                        show: show.id,
                        season: season_number,
                        episode: number,
                        watched_at,
                    });
                }
            }
            Some(WatchedShow { show, events })
        })
        .collect()
}
