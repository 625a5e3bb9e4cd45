//! Flat-file persistence for the watchlist.
//!
//! The on-disk format is a plain JSON array of identifier strings, e.g.
//! `["NSE:RELIANCE", "NSE:TCS", "256265"]`. A missing file reads as an
//! empty list so first boot needs no setup.

use crate::error::WatchlistResult;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct WatchlistStore {
    path: PathBuf,
}

impl WatchlistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> WatchlistResult<Vec<String>> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No watchlist file, starting empty");
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let identifiers: Vec<String> = serde_json::from_str(&content)?;
        info!(
            path = %self.path.display(),
            count = identifiers.len(),
            "Watchlist loaded"
        );
        Ok(identifiers)
    }

    pub fn save(&self, identifiers: &[String]) -> WatchlistResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(identifiers)?;
        fs::write(&self.path, content)?;
        debug!(
            path = %self.path.display(),
            count = identifiers.len(),
            "Watchlist saved"
        );
        Ok(())
    }
}
