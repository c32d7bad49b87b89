use std::collections::HashSet;

use crate::error::{GapFillError, Result};

use super::{CatalogEpisode, EpisodeKey, RunClass};

/// Maximal stretch of consecutive unwatched catalog episodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Run {
    pub(crate) class: RunClass,
    /// Ordinal of the first episode in the run.
    pub(crate) start: usize,
    pub(crate) episodes: Vec<CatalogEpisode>,
}

/// Partitions the unwatched part of `catalog` into Beginning, Gap and Ending runs.
pub(crate) fn classify(
    catalog: &[CatalogEpisode],
    watched: &HashSet<EpisodeKey>,
) -> Result<Vec<Run>> {
    if !catalog
        .iter()
        .any(|entry| watched.contains(&entry.episode.key()))
    {
        return Err(GapFillError::NoAnchor(
            "no watched episode in catalog".to_string(),
        ));
    }

    let mut runs = Vec::new();
    let mut current = Vec::new();
    let mut start = 0;
    let mut seen_watched = false;

    for entry in catalog {
        if !watched.contains(&entry.episode.key()) {
            if current.is_empty() {
                start = entry.episode.ordinal;
            }
            current.push(entry.clone());
            continue;
        }

        if !current.is_empty() {
            let class = if seen_watched {
                RunClass::Gap
            } else {
                RunClass::Beginning
            };
            runs.push(Run {
                class,
                start,
                episodes: std::mem::take(&mut current),
            });
        }
        seen_watched = true;
    }

    if !current.is_empty() {
        runs.push(Run {
            class: RunClass::Ending,
            start,
            episodes: current,
        });
    }

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::super::EpisodeRef;
    use super::*;

    fn catalog(len: u32) -> Vec<CatalogEpisode> {
        (1..=len)
            .map(|n| CatalogEpisode {
                episode: EpisodeRef {
                    show: 1,
                    season: 1,
                    episode: n,
                    ordinal: (n - 1) as usize,
                },
                air_date: None,
            })
            .collect()
    }

    fn watched(episodes: &[u32]) -> HashSet<EpisodeKey> {
        episodes.iter().map(|n| (1, *n)).collect()
    }

    fn shape(runs: &[Run]) -> Vec<(RunClass, Vec<u32>)> {
        runs.iter()
            .map(|run| {
                (
                    run.class,
                    run.episodes.iter().map(|e| e.episode.episode).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn splits_beginning_gaps_and_ending() {
        let runs = classify(&catalog(9), &watched(&[3, 5, 6, 8])).expect("anchored");
        assert_eq!(
            shape(&runs),
            vec![
                (RunClass::Beginning, vec![1, 2]),
                (RunClass::Gap, vec![4]),
                (RunClass::Gap, vec![7]),
                (RunClass::Ending, vec![9]),
            ]
        );
        assert_eq!(runs[1].start, 3);
    }

    #[test]
    fn fully_watched_show_has_no_runs() {
        let runs = classify(&catalog(3), &watched(&[1, 2, 3])).expect("anchored");
        assert!(runs.is_empty());
    }

    #[test]
    fn unwatched_show_has_no_anchor() {
        let err = classify(&catalog(3), &watched(&[])).expect_err("no anchor");
        assert!(matches!(err, GapFillError::NoAnchor(_)));
    }

    #[test]
    fn watched_episodes_outside_catalog_do_not_anchor() {
        let mut keys = watched(&[]);
        keys.insert((0, 1));
        assert!(classify(&catalog(3), &keys).is_err());
    }

    #[test]
    fn runs_partition_unwatched_episodes() {
        let catalog = catalog(12);
        let seen = watched(&[2, 3, 7, 10]);
        let runs = classify(&catalog, &seen).expect("anchored");

        let mut covered = runs
            .iter()
            .flat_map(|run| run.episodes.iter().map(|e| e.episode.ordinal))
            .collect::<Vec<_>>();
        let expected = catalog
            .iter()
            .filter(|e| !seen.contains(&e.episode.key()))
            .map(|e| e.episode.ordinal)
            .collect::<Vec<_>>();
        assert_eq!(covered, expected);
        covered.dedup();
        assert_eq!(covered.len(), expected.len());

        for run in &runs {
            for (offset, entry) in run.episodes.iter().enumerate() {
                assert_eq!(entry.episode.ordinal, run.start + offset);
            }
        }
    }
}
