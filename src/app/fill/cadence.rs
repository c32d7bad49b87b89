use chrono::{DateTime, TimeDelta, Utc};

/// Representative time between consecutive watched episodes of a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Cadence(pub(crate) TimeDelta);

/// Fallback step when a show has no usable cadence.
pub(crate) const DEFAULT_INTERVAL: TimeDelta = TimeDelta::days(1);

/// Deltas this long are breaks between viewing sessions, not a cadence.
const MAX_DELTA: TimeDelta = TimeDelta::days(365);

impl Cadence {
    pub(crate) fn step_or_default(cadence: Option<Self>) -> TimeDelta {
        cadence.map(|Cadence(step)| step).unwrap_or(DEFAULT_INTERVAL)
    }

    /// Compact form such as `40m`, `3h 20m` or `2d 4h`.
    pub(crate) fn describe(self) -> String {
        let total_minutes = self.0.num_minutes();
        let (days, hours, minutes) = (
            total_minutes / (24 * 60),
            total_minutes / 60 % 24,
            total_minutes % 60,
        );
        match (days, hours, minutes) {
            (0, 0, m) => format!("{m}m"),
            (0, h, 0) => format!("{h}h"),
            (0, h, m) => format!("{h}h {m}m"),
            (d, 0, _) => format!("{d}d"),
            (d, h, _) => format!("{d}d {h}h"),
        }
    }
}

/// Mean of consecutive deltas between watch times given in ordinal order.
/// Non-positive deltas (out-of-order viewing) and year-long breaks are ignored.
pub(crate) fn estimate(watch_times: &[DateTime<Utc>]) -> Option<Cadence> {
    let deltas = watch_times
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|delta| *delta > TimeDelta::zero() && *delta < MAX_DELTA)
        .collect::<Vec<_>>();
    if deltas.is_empty() {
        return None;
    }

    let total_secs = deltas.iter().map(TimeDelta::num_seconds).sum::<i64>();
    let mean_secs = total_secs / deltas.len() as i64;
    (mean_secs > 0).then(|| Cadence(TimeDelta::seconds(mean_secs)))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn fewer_than_two_events_is_undefined() {
        assert_eq!(estimate(&[]), None);
        assert_eq!(estimate(&[at(10, 0)]), None);
        assert_eq!(Cadence::step_or_default(None), TimeDelta::days(1));
    }

    #[test]
    fn describe_picks_the_two_largest_units() {
        assert_eq!(Cadence(TimeDelta::minutes(40)).describe(), "40m");
        assert_eq!(Cadence(TimeDelta::minutes(200)).describe(), "3h 20m");
        assert_eq!(Cadence(TimeDelta::hours(2)).describe(), "2h");
        assert_eq!(Cadence(TimeDelta::hours(52)).describe(), "2d 4h");
        assert_eq!(Cadence(TimeDelta::days(7)).describe(), "7d");
    }

    #[test]
    fn binge_session_yields_sub_hour_cadence() {
        let times = [at(20, 0), at(20, 45), at(21, 30), at(22, 15)];
        assert_eq!(estimate(&times), Some(Cadence(TimeDelta::minutes(45))));
    }

    #[test]
    fn mean_is_taken_over_deltas() {
        let times = [at(10, 0), at(11, 0), at(14, 0)];
        assert_eq!(estimate(&times), Some(Cadence(TimeDelta::minutes(120))));
    }

    #[test]
    fn out_of_order_deltas_are_ignored() {
        // ordinal order: E1 10:00, E2 09:00 (rewatched earlier), E3 11:00
        let times = [at(10, 0), at(9, 0), at(11, 0)];
        assert_eq!(estimate(&times), Some(Cadence(TimeDelta::hours(2))));
    }

    #[test]
    fn year_long_breaks_are_ignored() {
        let start = at(10, 0);
        let times = [start, start + TimeDelta::days(400), start + TimeDelta::days(402)];
        assert_eq!(estimate(&times), Some(Cadence(TimeDelta::days(2))));
    }
}
