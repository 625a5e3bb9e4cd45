//! Shared broker credential state.

use parking_lot::RwLock;

/// API key plus the rotating access token.
///
/// The feed session reads the token when building its connection URL; the
/// rotator replaces it. The api key never changes at runtime.
#[derive(Debug)]
pub struct Credentials {
    api_key: String,
    access_token: RwLock<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: RwLock::new(access_token.into()),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn access_token(&self) -> String {
        self.access_token.read().clone()
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write() = token.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_swap() {
        let creds = Credentials::new("key", "old");
        assert_eq!(creds.access_token(), "old");
        creds.set_access_token("new");
        assert_eq!(creds.access_token(), "new");
        assert_eq!(creds.api_key(), "key");
    }
}
