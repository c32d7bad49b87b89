use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use crate::error::{GapFillError, Result};

use super::RunClass;

/// Show number (1-based, as displayed) to the run classes to fill for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectionSpec {
    shows: BTreeMap<usize, BTreeSet<RunClass>>,
}

impl SelectionSpec {
    #[cfg(test)]
    pub(crate) fn classes(&self, show_number: usize) -> Option<&BTreeSet<RunClass>> {
        self.shows.get(&show_number)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &BTreeSet<RunClass>)> {
        self.shows.iter().map(|(number, classes)| (*number, classes))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    fn add(&mut self, show_number: usize, classes: &[RunClass]) {
        self.shows
            .entry(show_number)
            .or_default()
            .extend(classes.iter().copied());
    }
}

/// Parses tokens like `3`, `1-4b`, `7e`, `2be` or `allbe`.
///
/// Gaps are always included; `b` adds the beginning and `e` the ending.
/// Tokens naming the same show accumulate.
pub(crate) fn parse(input: &str, show_count: usize) -> Result<SelectionSpec> {
    let mut spec = SelectionSpec::default();
    for raw in input.split_whitespace() {
        let token = raw.to_ascii_lowercase();
        let (index_expr, modifier) = split_token(&token);
        let classes = parse_modifier(modifier, raw)?;
        for show_number in parse_index_expr(index_expr, show_count, raw)? {
            spec.add(show_number, classes);
        }
    }
    Ok(spec)
}

fn split_token(token: &str) -> (&str, &str) {
    if let Some(rest) = token.strip_prefix("all") {
        return ("all", rest);
    }
    let split_at = token
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '-'))
        .unwrap_or(token.len());
    token.split_at(split_at)
}

fn parse_modifier(modifier: &str, token: &str) -> Result<&'static [RunClass]> {
    match modifier {
        "" => Ok(&[RunClass::Gap]),
        "b" => Ok(&[RunClass::Beginning, RunClass::Gap]),
        "e" => Ok(&[RunClass::Gap, RunClass::Ending]),
        "be" | "eb" => Ok(&RunClass::ALL),
        other => Err(GapFillError::parse(
            token,
            format!("unknown modifier '{other}' (use b, e or be)"),
        )),
    }
}

fn parse_index_expr(
    expr: &str,
    show_count: usize,
    token: &str,
) -> Result<RangeInclusive<usize>> {
    if expr == "all" {
        return Ok(1..=show_count);
    }
    if expr.is_empty() {
        return Err(GapFillError::parse(token, "missing show number"));
    }

    let (start, end) = match expr.split_once('-') {
        Some((start, end)) => (
            parse_number(start, show_count, token)?,
            parse_number(end, show_count, token)?,
        ),
        None => {
            let number = parse_number(expr, show_count, token)?;
            (number, number)
        }
    };
    if start > end {
        return Err(GapFillError::parse(
            token,
            format!("range start {start} is after end {end}"),
        ));
    }
    for index in [start, end] {
        if index == 0 || index > show_count {
            return Err(GapFillError::Index {
                index,
                max: show_count,
            });
        }
    }
    Ok(start..=end)
}

fn parse_number(raw: &str, show_count: usize, token: &str) -> Result<usize> {
    if raw.is_empty() || !raw.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(GapFillError::parse(token, format!("'{raw}' is not a number")));
    }
    // All digits, so the only failure left is overflow: out of range.
    raw.parse::<usize>().map_err(|_| GapFillError::Index {
        index: usize::MAX,
        max: show_count,
    })
}
