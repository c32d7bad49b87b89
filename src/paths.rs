use std::path::PathBuf;

use anyhow::{Context, Result};

pub const LOCAL_CREDENTIALS_FILE: &str = "trakt_credentials.txt";

pub fn credentials_file_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("unable to resolve config directory")?;
    Ok(base.join("trakt-gapfill").join("credentials.txt"))
}
