use chrono::{DateTime, TimeDelta, Utc};

use super::{Cadence, EpisodeRef, Run};

/// An episode may not be marked watched earlier than this long after it aired.
pub(crate) const AIR_DATE_BUFFER: TimeDelta = TimeDelta::hours(12);

/// Spacing used once a floor has pushed a gap to or past its right bound.
const STALLED_STEP: TimeDelta = TimeDelta::minutes(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Synthesized {
    pub(crate) episode: EpisodeRef,
    pub(crate) watched_at: DateTime<Utc>,
    /// The air-date floor replaced the cadence/proportional candidate.
    pub(crate) floored: bool,
}

pub(crate) fn air_date_floor(air_date: DateTime<Utc>) -> DateTime<Utc> {
    air_date + AIR_DATE_BUFFER
}

/// One timestamp per dated episode of `run`, in ordinal order.
///
/// Both bounds present: proportional split of the interval. Only `right`:
/// walk backward by the cadence. Only `left`: walk forward by the cadence.
/// Every result is at least `air_date + 12h`; a floored value becomes the new
/// pointer for the rest of the run.
pub(crate) fn synthesize(
    run: &Run,
    cadence: Option<Cadence>,
    left: Option<DateTime<Utc>>,
    right: Option<DateTime<Utc>>,
) -> Vec<Synthesized> {
    let fillable = run
        .episodes
        .iter()
        .filter_map(|entry| {
            entry
                .air_date
                .map(|aired| (entry.episode, air_date_floor(aired)))
        })
        .collect::<Vec<_>>();
    if fillable.is_empty() {
        return Vec::new();
    }

    let step = Cadence::step_or_default(cadence);
    match (left, right) {
        (Some(left), Some(right)) => fill_between(&fillable, left, right),
        (Some(left), None) => fill_forward(&fillable, left, step),
        (None, Some(right)) => fill_backward(&fillable, right, step),
        (None, None) => Vec::new(),
    }
}

fn apply_floor(
    episode: EpisodeRef,
    candidate: DateTime<Utc>,
    floor: DateTime<Utc>,
) -> Synthesized {
    if candidate < floor {
        Synthesized {
            episode,
            watched_at: floor,
            floored: true,
        }
    } else {
        Synthesized {
            episode,
            watched_at: candidate,
            floored: false,
        }
    }
}

fn fill_between(
    fillable: &[(EpisodeRef, DateTime<Utc>)],
    left: DateTime<Utc>,
    right: DateTime<Utc>,
) -> Vec<Synthesized> {
    let mut out = Vec::with_capacity(fillable.len());
    let mut segment_anchor = left;
    let mut segment_len = fillable.len() as i64;
    let mut position = 0_i64;
    let mut previous = left;
    // Set once a floor lands at or past an ordered `right`; no room remains.
    let mut stalled = false;

    for (idx, (episode, floor)) in fillable.iter().enumerate() {
        position += 1;
        let candidate = if stalled {
            previous + STALLED_STEP
        } else {
            // Signed span: inverted or equal bounds keep the plain formula.
            let span_secs = (right - segment_anchor).num_seconds();
            segment_anchor + TimeDelta::seconds(span_secs * position / (segment_len + 1))
        };

        let assigned = apply_floor(*episode, candidate, *floor);
        if assigned.floored {
            segment_anchor = assigned.watched_at;
            segment_len = (fillable.len() - idx - 1) as i64;
            position = 0;
            stalled = left < right && assigned.watched_at >= right;
        }
        previous = assigned.watched_at;
        out.push(assigned);
    }
    out
}

fn fill_forward(
    fillable: &[(EpisodeRef, DateTime<Utc>)],
    left: DateTime<Utc>,
    step: TimeDelta,
) -> Vec<Synthesized> {
    let mut pointer = left;
    fillable
        .iter()
        .map(|(episode, floor)| {
            let assigned = apply_floor(*episode, pointer + step, *floor);
            pointer = assigned.watched_at;
            assigned
        })
        .collect()
}

fn fill_backward(
    fillable: &[(EpisodeRef, DateTime<Utc>)],
    right: DateTime<Utc>,
    step: TimeDelta,
) -> Vec<Synthesized> {
    let mut pointer = right;
    let mut out = fillable
        .iter()
        .rev()
        .map(|(episode, floor)| {
            let assigned = apply_floor(*episode, pointer - step, *floor);
            pointer = assigned.watched_at;
            assigned
        })
        .collect::<Vec<_>>();
    out.reverse();
    out
}
