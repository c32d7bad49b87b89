use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::GapFillError;
use crate::http::HttpSettings;
use crate::paths::{LOCAL_CREDENTIALS_FILE, credentials_file_path};

pub(crate) const DEFAULT_API_URL: &str = "https://api.trakt.tv";
const DEFAULT_HISTORY_PAGE_SIZE: usize = 1000;

const REQUIRED_KEYS: [&str; 3] = ["CLIENT_ID", "ACCESS_TOKEN", "USERNAME"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub(crate) client_id: String,
    pub(crate) access_token: String,
    pub(crate) username: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) base_url: String,
    pub(crate) history_page_size: usize,
    pub(crate) http: HttpSettings,
}

impl ApiSettings {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("TRAKT_API_URL")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let history_page_size = lookup("TRAKT_HISTORY_PAGE_SIZE")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE);
        Self {
            base_url,
            history_page_size,
            http: HttpSettings::default(),
        }
    }
}

/// Picks the credentials file: explicit flag, env var, `./trakt_credentials.txt`
/// when present, then the per-user config directory.
pub(crate) fn resolve_credentials_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(custom) = env::var("TRAKT_GAPFILL_CREDENTIALS")
        && !custom.trim().is_empty()
    {
        return Ok(PathBuf::from(custom));
    }
    let local = PathBuf::from(LOCAL_CREDENTIALS_FILE);
    if local.exists() {
        return Ok(local);
    }
    credentials_file_path()
}

pub(crate) fn parse_credentials(raw: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        values.insert(key.trim().to_string(), value.trim().to_string());
    }
    values
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || value.starts_with("YOUR_")
}

pub(crate) fn load_credentials<F>(path: &Path, env_lookup: F) -> Result<Credentials, GapFillError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = if path.exists() {
        let raw = fs::read_to_string(path).map_err(|err| {
            GapFillError::auth(format!(
                "failed to read credentials at {}: {err}",
                path.display()
            ))
        })?;
        parse_credentials(&raw)
    } else {
        debug!(path = %path.display(), "credentials file not found, relying on environment");
        HashMap::new()
    };

    for key in REQUIRED_KEYS {
        if let Some(value) = env_lookup(&format!("TRAKT_{key}")) {
            values.insert(key.to_string(), value.trim().to_string());
        }
    }

    let missing = REQUIRED_KEYS
        .iter()
        .filter(|key| values.get(**key).is_none_or(|value| is_placeholder(value)))
        .copied()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(GapFillError::auth(format!(
            "missing {} in {}",
            missing.join(", "),
            path.display()
        )));
    }

    let mut take = |key: &str| values.remove(key).unwrap_or_default();
    Ok(Credentials {
        client_id: take("CLIENT_ID"),
        access_token: take("ACCESS_TOKEN"),
        username: take("USERNAME"),
    })
}
