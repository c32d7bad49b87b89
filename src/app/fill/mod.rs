//! Intelligent fill engine: classify missing episodes, estimate viewing cadence
//! and synthesize watch timestamps for the ones the user chooses to fill.

mod cadence;
mod catalog;
mod classify;
mod history;
mod plan;
mod selection;
mod synth;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};

pub(crate) use cadence::*;
pub(crate) use catalog::*;
pub(crate) use classify::*;
pub(crate) use history::*;
pub(crate) use plan::*;
pub(crate) use selection::*;
pub(crate) use synth::*;

use crate::error::Result;

pub(crate) type ShowId = u64;

/// `(season, episode)`; its natural ordering is the ordinal ordering.
pub(crate) type EpisodeKey = (u32, u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Show {
    pub(crate) id: ShowId,
    pub(crate) title: String,
    pub(crate) year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EpisodeRef {
    pub(crate) show: ShowId,
    pub(crate) season: u32,
    pub(crate) episode: u32,
    pub(crate) ordinal: usize,
}

impl EpisodeRef {
    pub(crate) fn key(&self) -> EpisodeKey {
        (self.season, self.episode)
    }
}

impl fmt::Display for EpisodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CatalogEpisode {
    pub(crate) episode: EpisodeRef,
    /// `None` when unknown or not yet released; such episodes are never filled.
    pub(crate) air_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WatchEvent {
    pub(crate) show: ShowId,
    pub(crate) season: u32,
    pub(crate) episode: u32,
    pub(crate) watched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum RunClass {
    Beginning,
    Gap,
    Ending,
}

impl RunClass {
    pub(crate) const ALL: [RunClass; 3] = [Self::Beginning, Self::Gap, Self::Ending];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Beginning => "before first",
            Self::Gap => "in gaps",
            Self::Ending => "after last",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ShowState {
    pub(crate) show: Show,
    pub(crate) catalog: Vec<CatalogEpisode>,
    pub(crate) events: BTreeMap<EpisodeKey, DateTime<Utc>>,
}

impl ShowState {
    pub(crate) fn new(show: Show, catalog: Vec<CatalogEpisode>, events: &[WatchEvent]) -> Self {
        let mut by_key = BTreeMap::new();
        for event in events.iter().filter(|event| event.show == show.id) {
            record_earliest(&mut by_key, (event.season, event.episode), event.watched_at);
        }
        Self {
            show,
            catalog,
            events: by_key,
        }
    }

    pub(crate) fn watched_keys(&self) -> HashSet<EpisodeKey> {
        self.events.keys().copied().collect()
    }

    pub(crate) fn watched_at(&self, key: EpisodeKey) -> Option<DateTime<Utc>> {
        self.events.get(&key).copied()
    }

    pub(crate) fn watched_in_catalog(&self) -> usize {
        self.catalog
            .iter()
            .filter(|entry| self.events.contains_key(&entry.episode.key()))
            .count()
    }

    /// Watch timestamps of regular-season episodes in ordinal order.
    pub(crate) fn ordered_watch_times(&self) -> Vec<DateTime<Utc>> {
        self.events
            .iter()
            .filter(|((season, _), _)| *season > 0)
            .map(|(_, watched_at)| *watched_at)
            .collect()
    }

    /// Watched timestamps immediately before and after `run` in the catalog.
    pub(crate) fn run_bounds(&self, run: &Run) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let before = run
            .start
            .checked_sub(1)
            .and_then(|idx| self.catalog.get(idx))
            .and_then(|entry| self.watched_at(entry.episode.key()));
        let after = self
            .catalog
            .get(run.start + run.episodes.len())
            .and_then(|entry| self.watched_at(entry.episode.key()));
        (before, after)
    }
}

pub(crate) fn record_earliest(
    map: &mut BTreeMap<EpisodeKey, DateTime<Utc>>,
    key: EpisodeKey,
    watched_at: DateTime<Utc>,
) {
    map.entry(key)
        .and_modify(|current| {
            if watched_at < *current {
                *current = watched_at;
            }
        })
        .or_insert(watched_at);
}

/// Everything derived for one show: its runs, cadence and synthesized timestamps.
#[derive(Debug, Clone)]
pub(crate) struct ShowAnalysis {
    pub(crate) state: ShowState,
    pub(crate) cadence: Option<Cadence>,
    pub(crate) runs: Vec<FilledRun>,
}

#[derive(Debug, Clone)]
pub(crate) struct FilledRun {
    pub(crate) run: Run,
    pub(crate) before: Option<DateTime<Utc>>,
    pub(crate) after: Option<DateTime<Utc>>,
    pub(crate) timestamps: Vec<Synthesized>,
}

impl ShowAnalysis {
    pub(crate) fn fillable(&self, class: RunClass) -> usize {
        self.runs
            .iter()
            .filter(|filled| filled.run.class == class)
            .map(|filled| filled.timestamps.len())
            .sum()
    }

    pub(crate) fn total_fillable(&self) -> usize {
        self.runs.iter().map(|filled| filled.timestamps.len()).sum()
    }

    /// Missing episodes that cannot be filled because they have no air date.
    pub(crate) fn undated(&self) -> usize {
        self.runs
            .iter()
            .map(|filled| filled.run.episodes.len() - filled.timestamps.len())
            .sum()
    }
}

/// Runs the classifier, cadence estimator and synthesizer for one show.
/// Fails with `NoAnchor` when the show has no watched episode in its catalog.
pub(crate) fn analyze_show(state: ShowState) -> Result<ShowAnalysis> {
    let runs = classify(&state.catalog, &state.watched_keys())?;
    let cadence = estimate(&state.ordered_watch_times());
    let runs = runs
        .into_iter()
        .map(|run| {
            let (before, after) = state.run_bounds(&run);
            let timestamps = synthesize(&run, cadence, before, after);
            FilledRun {
                run,
                before,
                after,
                timestamps,
            }
        })
        .collect();
    Ok(ShowAnalysis {
        state,
        cadence,
        runs,
    })
}
