//! Login collaborator seam.
//!
//! The headless-browser login automation lives outside this system; the
//! rotator only sees this trait. One attempt per rotation, no retries.

use crate::error::{RotationError, RotationResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Fresh access token.
    pub credential: String,
    /// How long the collaborator took.
    pub obtained_in: Duration,
}

/// External login automation.
#[async_trait]
pub trait LoginProvider: Send + Sync {
    async fn login(&self) -> RotationResult<LoginOutcome>;
}

/// Scripted provider for tests: yields queued outcomes in order, repeating
/// the last one once the queue runs dry.
pub struct FixedLoginProvider {
    outcomes: Mutex<Vec<Result<LoginOutcome, String>>>,
}

impl FixedLoginProvider {
    pub fn new(outcomes: Vec<Result<LoginOutcome, String>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
        }
    }

    /// Always returns the given credential.
    pub fn always(credential: impl Into<String>) -> Self {
        Self::new(vec![Ok(LoginOutcome {
            credential: credential.into(),
            obtained_in: Duration::from_secs(1),
        })])
    }

    /// Always fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(vec![Err(message.into())])
    }
}

#[async_trait]
impl LoginProvider for FixedLoginProvider {
    async fn login(&self) -> RotationResult<LoginOutcome> {
        let next = {
            let mut outcomes = self.outcomes.lock();
            if outcomes.len() > 1 {
                outcomes.remove(0)
            } else {
                outcomes
                    .first()
                    .cloned()
                    .unwrap_or_else(|| Err("no scripted outcome".to_string()))
            }
        };
        next.map_err(RotationError::Login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_provider_repeats_last_outcome() {
        let provider = FixedLoginProvider::always("tok");
        assert_eq!(provider.login().await.unwrap().credential, "tok");
        assert_eq!(provider.login().await.unwrap().credential, "tok");
    }

    #[tokio::test]
    async fn test_fixed_provider_sequences_outcomes() {
        let provider = FixedLoginProvider::new(vec![
            Err("captcha".to_string()),
            Ok(LoginOutcome {
                credential: "tok2".to_string(),
                obtained_in: Duration::from_secs(2),
            }),
        ]);
        assert!(provider.login().await.is_err());
        assert_eq!(provider.login().await.unwrap().credential, "tok2");
    }
}
