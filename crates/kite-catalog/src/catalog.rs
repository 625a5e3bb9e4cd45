//! In-memory bidirectional instrument map.

use kite_core::{Instrument, Token};
use std::collections::HashMap;
use tracing::debug;

/// Token <-> symbol map, immutable after load.
pub struct InstrumentCatalog {
    by_token: HashMap<Token, Instrument>,
    by_symbol: HashMap<String, Token>,
}

impl InstrumentCatalog {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        let mut by_token = HashMap::with_capacity(instruments.len());
        let mut by_symbol = HashMap::with_capacity(instruments.len());
        for instrument in instruments {
            by_symbol.insert(instrument.symbol.clone(), instrument.token);
            by_token.insert(instrument.token, instrument);
        }
        Self { by_token, by_symbol }
    }

    pub fn get(&self, token: Token) -> Option<&Instrument> {
        self.by_token.get(&token)
    }

    /// Display name for a token; falls back to the raw number for tokens
    /// the catalog does not know.
    pub fn display_name(&self, token: Token) -> String {
        self.by_token
            .get(&token)
            .map(|i| i.name.clone())
            .unwrap_or_else(|| token.to_string())
    }

    pub fn token_for_symbol(&self, symbol: &str) -> Option<Token> {
        self.by_symbol.get(symbol).copied()
    }

    /// Resolve a registry identifier: either `NSE:SYMBOL` or a raw numeric
    /// token.
    pub fn resolve(&self, identifier: &str) -> Option<Token> {
        if let Some(symbol) = identifier.strip_prefix("NSE:") {
            return self.token_for_symbol(symbol);
        }
        if let Ok(raw) = identifier.parse::<u32>() {
            let token = Token::new(raw);
            if self.by_token.contains_key(&token) {
                return Some(token);
            }
            debug!(identifier, "Numeric identifier not in catalog, using as-is");
            return Some(token);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}
