use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{ApiSettings, Credentials};
use crate::error::{GapFillError, Result};
use crate::http::{HttpError, get_text_with_retries, post_json};

use super::fill::{
    CatalogEpisode, EpisodeRef, FillPlan, ShowId, WatchIndex, WatchedShow, normalize_catalog,
    parse_watched_shows,
};

/// Authenticated Trakt session. Holds everything the requests need so that
/// nothing is read from global state mid-run.
#[derive(Debug, Clone)]
pub(crate) struct TraktClient {
    settings: ApiSettings,
    credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubmissionReport {
    pub(crate) planned: usize,
    pub(crate) added: u64,
    /// Human-readable descriptions of the entries the remote did not recognise.
    pub(crate) not_found: Vec<String>,
    /// Planned episodes that belong to a show the remote did not recognise.
    pub(crate) rejected: Vec<EpisodeRef>,
}

impl SubmissionReport {
    pub(crate) fn is_complete(&self) -> bool {
        self.added >= self.planned as u64 && self.not_found.is_empty()
    }
}

impl TraktClient {
    pub(crate) fn new(settings: ApiSettings, credentials: Credentials) -> Self {
        Self {
            settings,
            credentials,
        }
    }

    pub(crate) fn username(&self) -> &str {
        &self.credentials.username
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("trakt-api-version".to_string(), "2".to_string()),
            (
                "trakt-api-key".to_string(),
                self.credentials.client_id.clone(),
            ),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.credentials.access_token),
            ),
        ]
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.base_url)
    }

    fn get_json(&self, path: &str, query: &[(String, String)], what: &str) -> Result<Value> {
        let body = get_text_with_retries(
            &self.url(path),
            &self.headers(),
            query,
            &self.settings.http,
        )
        .map_err(|err| classify_read_error(err, what))?;
        serde_json::from_str(&body)
            .map_err(|err| GapFillError::fetch(what, format!("invalid JSON: {err}")))
    }

    pub(crate) fn watched_shows(&self) -> Result<Vec<WatchedShow>> {
        let path = format!("/users/{}/watched/shows", self.credentials.username);
        let value = self.get_json(&path, &[], "watched shows")?;
        let shows = parse_watched_shows(&value);
        info!(count = shows.len(), "loaded watched shows");
        Ok(shows)
    }

    /// Full episode history, page by page until a short page arrives.
    pub(crate) fn history(&self) -> Result<WatchIndex> {
        let path = format!("/users/{}/history/shows", self.credentials.username);
        let limit = self.settings.history_page_size;
        let mut index = WatchIndex::default();
        let mut page = 1_usize;
        loop {
            let query = vec![
                ("page".to_string(), page.to_string()),
                ("limit".to_string(), limit.to_string()),
            ];
            let value = self.get_json(&path, &query, "watch history")?;
            let received = index.extend_history(&value);
            debug!(page, received, "history page");
            if received < limit {
                break;
            }
            page += 1;
        }
        info!(events = index.len(), skipped = index.skipped, "indexed watch history");
        Ok(index)
    }

    pub(crate) fn seasons(
        &self,
        show: ShowId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<CatalogEpisode>> {
        let path = format!("/shows/{show}/seasons");
        let query = vec![("extended".to_string(), "full,episodes".to_string())];
        let value = self.get_json(&path, &query, &format!("seasons of show {show}"))?;
        Ok(normalize_catalog(show, &value, as_of))
    }

    /// Submits the whole plan in one request. Never retried.
    pub(crate) fn add_history(&self, plan: &FillPlan) -> Result<SubmissionReport> {
        let body = plan.to_payload().to_string();
        let (status, text) = post_json(
            &self.url("/sync/history"),
            &self.headers(),
            &body,
            &self.settings.http,
        )
        .map_err(|err| {
            if err.is_unauthorized() {
                GapFillError::auth(err.to_string())
            } else {
                GapFillError::Submission(err.to_string())
            }
        })?;
        debug!(status, "history submission response");

        let value: Value = serde_json::from_str(&text).map_err(|err| {
            GapFillError::Submission(format!("unreadable response (HTTP {status}): {err}"))
        })?;
        Ok(parse_submission_response(&value, plan))
    }
}

fn classify_read_error(err: HttpError, what: &str) -> GapFillError {
    if err.is_unauthorized() {
        GapFillError::auth(err.to_string())
    } else {
        GapFillError::fetch(what, err.to_string())
    }
}

fn describe_not_found(kind: &str, item: &Value) -> String {
    if let Some(id) = item.pointer("/ids/trakt").and_then(Value::as_u64) {
        return format!("{kind} {id}");
    }
    if let Some(number) = item.get("number").and_then(Value::as_u64) {
        return format!("{kind} number {number}");
    }
    format!("{kind} {item}")
}

pub(crate) fn parse_submission_response(value: &Value, plan: &FillPlan) -> SubmissionReport {
    let added = value
        .pointer("/added/episodes")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut not_found = Vec::new();
    let mut missing_shows = HashSet::new();
    for (key, kind) in [("shows", "show"), ("seasons", "season"), ("episodes", "episode")] {
        let items = value
            .pointer(&format!("/not_found/{key}"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for item in items {
            if key == "shows"
                && let Some(id) = item.pointer("/ids/trakt").and_then(Value::as_u64)
            {
                missing_shows.insert(id);
            }
            not_found.push(describe_not_found(kind, item));
        }
    }

    let rejected = plan
        .entries
        .iter()
        .filter(|entry| missing_shows.contains(&entry.episode.show))
        .map(|entry| entry.episode)
        .collect();

    SubmissionReport {
        planned: plan.len(),
        added,
        not_found,
        rejected,
    }
}
