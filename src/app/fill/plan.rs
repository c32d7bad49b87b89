use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use super::{EpisodeRef, FilledRun, RunClass, SelectionSpec, ShowAnalysis, ShowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlannedEpisode {
    pub(crate) episode: EpisodeRef,
    pub(crate) class: RunClass,
    pub(crate) watched_at: DateTime<Utc>,
}

/// Final batch, ordered by show number and then by ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FillPlan {
    pub(crate) entries: Vec<PlannedEpisode>,
}

impl FillPlan {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn count(&self, show: ShowId, class: RunClass) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.episode.show == show && entry.class == class)
            .count()
    }

    pub(crate) fn after(&self, as_of: DateTime<Utc>) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.watched_at > as_of)
            .count()
    }

    /// Body for `POST /sync/history`, grouped by show and season.
    pub(crate) fn to_payload(&self) -> Value {
        let mut grouped: BTreeMap<ShowId, BTreeMap<u32, Vec<Value>>> = BTreeMap::new();
        let mut show_order = Vec::new();
        for entry in &self.entries {
            let show = entry.episode.show;
            if !grouped.contains_key(&show) {
                show_order.push(show);
            }
            grouped
                .entry(show)
                .or_default()
                .entry(entry.episode.season)
                .or_default()
                .push(json!({
                    "number": entry.episode.episode,
                    "watched_at": format_watched_at(entry.watched_at),
                }));
        }

        let shows = show_order
            .into_iter()
            .filter_map(|show| {
                let seasons = grouped.remove(&show)?;
                let seasons = seasons
                    .into_iter()
                    .map(|(number, episodes)| json!({ "number": number, "episodes": episodes }))
                    .collect::<Vec<_>>();
                Some(json!({ "ids": { "trakt": show }, "seasons": seasons }))
            })
            .collect::<Vec<_>>();
        json!({ "shows": shows })
    }
}

pub(crate) fn format_watched_at(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn format_display(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Intersects the synthesized runs with the user's selection.
pub(crate) fn build(shows: &[ShowAnalysis], selection: &SelectionSpec) -> FillPlan {
    let mut entries = Vec::new();
    for (number, classes) in selection.iter() {
        let Some(analysis) = number.checked_sub(1).and_then(|idx| shows.get(idx)) else {
            continue;
        };
        for filled in &analysis.runs {
            if !classes.contains(&filled.run.class) {
                continue;
            }
            entries.extend(filled.timestamps.iter().map(|synth| PlannedEpisode {
                episode: synth.episode,
                class: filled.run.class,
                watched_at: synth.watched_at,
            }));
        }
    }
    FillPlan { entries }
}

fn class_counts(counts: [usize; 3]) -> String {
    RunClass::ALL
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(class, count)| format!("{count} {}", class.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn show_heading(number: usize, analysis: &ShowAnalysis) -> String {
    let show = &analysis.state.show;
    match show.year {
        Some(year) => format!("[{number}] {} ({year})", show.title),
        None => format!("[{number}] {}", show.title),
    }
}

/// Per-show listing shown before the selection prompt.
pub(crate) fn render_summary(shows: &[ShowAnalysis]) -> String {
    let mut out = String::new();
    for (idx, analysis) in shows.iter().enumerate() {
        let counts = RunClass::ALL.map(|class| analysis.fillable(class));
        let _ = writeln!(out, "{}", show_heading(idx + 1, analysis));
        let _ = writeln!(
            out,
            "    Watched: {}/{} episodes",
            analysis.state.watched_in_catalog(),
            analysis.state.catalog.len()
        );
        if let Some(cadence) = analysis.cadence {
            let _ = writeln!(out, "    Pace: about {} between episodes", cadence.describe());
        }
        let _ = write!(out, "    Missing: {}", class_counts(counts));
        let undated = analysis.undated();
        if undated > 0 {
            let _ = write!(out, " ({undated} unreleased or undated, skipped)");
        }
        let _ = writeln!(out);
    }
    out
}

fn episode_span(filled: &FilledRun) -> Option<String> {
    let first = filled.timestamps.first()?;
    let last = filled.timestamps.last()?;
    if first.episode == last.episode {
        return Some(format!(
            "{} -> {}",
            first.episode,
            format_display(first.watched_at)
        ));
    }
    Some(format!(
        "{}..{} ({} eps) -> {} .. {}",
        first.episode,
        last.episode,
        filled.timestamps.len(),
        format_display(first.watched_at),
        format_display(last.watched_at)
    ))
}

fn bounds_note(filled: &FilledRun) -> String {
    match (filled.before, filled.after) {
        (Some(before), Some(after)) => format!(
            "between watched {} and {}",
            format_display(before),
            format_display(after)
        ),
        (Some(before), None) => format!("after last watched {}", format_display(before)),
        (None, Some(after)) => format!("before first watched {}", format_display(after)),
        (None, None) => String::new(),
    }
}

/// Exact per-show, per-class counts plus the computed timestamps of each run.
/// This is what the user confirms before anything is submitted.
pub(crate) fn render_preview(
    shows: &[ShowAnalysis],
    selection: &SelectionSpec,
    plan: &FillPlan,
    as_of: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Will mark {} episodes:", plan.len());
    for (number, classes) in selection.iter() {
        let Some(analysis) = number.checked_sub(1).and_then(|idx| shows.get(idx)) else {
            continue;
        };
        let show_id = analysis.state.show.id;
        let counts = RunClass::ALL.map(|class| {
            if classes.contains(&class) {
                plan.count(show_id, class)
            } else {
                0
            }
        });
        let total = counts.iter().sum::<usize>();
        if total == 0 {
            let _ = writeln!(
                out,
                "  {}: nothing to fill for {}",
                show_heading(number, analysis),
                selected_labels(classes)
            );
            continue;
        }
        let _ = writeln!(
            out,
            "  {}: {total} episodes ({})",
            show_heading(number, analysis),
            class_counts(counts)
        );
        for filled in analysis
            .runs
            .iter()
            .filter(|filled| classes.contains(&filled.run.class))
        {
            let Some(span) = episode_span(filled) else {
                continue;
            };
            let _ = writeln!(out, "      {span}  [{}]", bounds_note(filled));
        }
    }

    let future = plan.after(as_of);
    if future > 0 {
        let _ = writeln!(
            out,
            "  Note: {future} timestamp(s) fall after {} (in the future).",
            format_display(as_of)
        );
    }
    out
}

fn selected_labels(classes: &BTreeSet<RunClass>) -> String {
    classes
        .iter()
        .map(|class| class.label())
        .collect::<Vec<_>>()
        .join(", ")
}
