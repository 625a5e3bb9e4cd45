//! In-memory watchlist with write-through persistence.

use crate::error::{WatchlistError, WatchlistResult};
use crate::store::WatchlistStore;
use kite_catalog::InstrumentCatalog;
use kite_core::Token;
use parking_lot::RwLock;
use tracing::{error, warn};

/// Ordered, deduplicated list of tracked identifiers.
///
/// Mutations persist immediately; a persistence failure keeps the
/// in-memory change, logs at error, and surfaces the error to the caller
/// so the user-facing command reply can mention it.
pub struct Watchlist {
    entries: RwLock<Vec<String>>,
    store: WatchlistStore,
}

impl Watchlist {
    /// Load from the backing store.
    pub fn load(store: WatchlistStore) -> WatchlistResult<Self> {
        let entries = store.load()?;
        Ok(Self {
            entries: RwLock::new(entries),
            store,
        })
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.read().iter().any(|e| e == identifier)
    }

    /// Append an identifier and persist.
    pub fn add(&self, identifier: &str) -> WatchlistResult<()> {
        {
            let mut entries = self.entries.write();
            if entries.iter().any(|e| e == identifier) {
                return Err(WatchlistError::AlreadyTracked(identifier.to_string()));
            }
            entries.push(identifier.to_string());
        }
        self.persist()
    }

    /// Remove an identifier and persist.
    pub fn remove(&self, identifier: &str) -> WatchlistResult<()> {
        {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|e| e != identifier);
            if entries.len() == before {
                return Err(WatchlistError::NotTracked(identifier.to_string()));
            }
        }
        self.persist()
    }

    fn persist(&self) -> WatchlistResult<()> {
        let entries = self.entries.read().clone();
        if let Err(e) = self.store.save(&entries) {
            error!(%e, "Failed to persist watchlist; in-memory change kept");
            return Err(e);
        }
        Ok(())
    }

    /// Map identifiers to tokens in list order. Unresolvable identifiers
    /// are skipped with a warning.
    pub fn resolve_tokens(&self, catalog: &InstrumentCatalog) -> Vec<Token> {
        self.entries
            .read()
            .iter()
            .filter_map(|identifier| {
                let token = catalog.resolve(identifier);
                if token.is_none() {
                    warn!(identifier, "Unresolvable watchlist identifier skipped");
                }
                token
            })
            .collect()
    }
}
