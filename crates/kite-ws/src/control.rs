//! Outbound subscription control frames.
//!
//! The broker accepts text JSON of the form `{"a": <action>, "v": <value>}`
//! where the mode action nests its value as `[mode, [tokens]]`.

use kite_core::Token;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Which fields the broker should stream for subscribed tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionMode {
    Ltp,
    Quote,
    #[default]
    Full,
}

impl SubscriptionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ltp => "ltp",
            Self::Quote => "quote",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for SubscriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn raw_tokens(tokens: &[Token]) -> Vec<u32> {
    tokens.iter().map(Token::raw).collect()
}

pub fn subscribe_message(tokens: &[Token]) -> String {
    json!({"a": "subscribe", "v": raw_tokens(tokens)}).to_string()
}

pub fn unsubscribe_message(tokens: &[Token]) -> String {
    json!({"a": "unsubscribe", "v": raw_tokens(tokens)}).to_string()
}

pub fn mode_message(mode: SubscriptionMode, tokens: &[Token]) -> String {
    json!({"a": "mode", "v": [mode.as_str(), raw_tokens(tokens)]}).to_string()
}
