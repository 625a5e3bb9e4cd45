//! Login provider backed by an external command.
//!
//! The actual broker login (headless browser, TOTP) lives in a separate
//! tool; this provider runs it and reads the fresh access token from its
//! stdout. Broker secrets reach the tool through the inherited process
//! environment.

use async_trait::async_trait;
use kite_rotator::{LoginOutcome, LoginProvider, RotationError, RotationResult};
use std::time::Instant;
use tokio::process::Command;
use tracing::info;

pub struct CommandLoginProvider {
    command: String,
}

impl CommandLoginProvider {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl LoginProvider for CommandLoginProvider {
    async fn login(&self) -> RotationResult<LoginOutcome> {
        let started = Instant::now();
        info!(command = %self.command, "Running login command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await
            .map_err(|e| RotationError::Login(format!("Failed to spawn login command: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotationError::Login(format!(
                "Login command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let credential = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if credential.is_empty() {
            return Err(RotationError::Login(
                "Login command printed no credential".to_string(),
            ));
        }

        Ok(LoginOutcome {
            credential,
            obtained_in: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_output_becomes_credential() {
        let provider = CommandLoginProvider::new("printf 'tok123\\n'");
        let outcome = provider.login().await.unwrap();
        assert_eq!(outcome.credential, "tok123");
    }

    #[tokio::test]
    async fn test_failing_command_is_an_error() {
        let provider = CommandLoginProvider::new("exit 3");
        assert!(matches!(
            provider.login().await,
            Err(RotationError::Login(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_output_is_an_error() {
        let provider = CommandLoginProvider::new("true");
        assert!(matches!(
            provider.login().await,
            Err(RotationError::Login(_))
        ));
    }
}
