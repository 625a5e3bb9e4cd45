//! HTTP client for the broker REST API.
//!
//! Fetches the NSE instrument dump (tens of thousands of rows, cached in
//! memory by the catalog) and validates the current credential via the
//! profile endpoint.

use crate::error::{CatalogError, CatalogResult};
use kite_core::{Credentials, Instrument, Token};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw instrument row from the dump endpoint.
#[derive(Debug, Deserialize)]
struct RawInstrument {
    instrument_token: u32,
    tradingsymbol: String,
    #[serde(default)]
    name: Option<String>,
    exchange: String,
}

/// Client for the broker REST API.
pub struct KiteHttpClient {
    client: Client,
    base_url: String,
    credentials: Arc<Credentials>,
}

impl KiteHttpClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<Credentials>,
    ) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            credentials,
        })
    }

    fn auth_header(&self) -> String {
        format!(
            "token {}:{}",
            self.credentials.api_key(),
            self.credentials.access_token()
        )
    }

    /// Fetch the instrument dump for an exchange.
    pub async fn fetch_instruments(&self, exchange: &str) -> CatalogResult<Vec<Instrument>> {
        let url = format!("{}/instruments/{exchange}", self.base_url);
        info!(%url, "Fetching instrument dump");

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| CatalogError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let rows: Vec<RawInstrument> = response
            .json()
            .await
            .map_err(|e| CatalogError::HttpClient(format!("Failed to parse dump: {e}")))?;

        let mut instruments = Vec::with_capacity(rows.len());
        for row in rows {
            if row.exchange != exchange {
                continue;
            }
            let name = match row.name {
                Some(name) if !name.is_empty() => name,
                _ => row.tradingsymbol.clone(),
            };
            instruments.push(Instrument::new(
                Token::new(row.instrument_token),
                row.tradingsymbol,
                name,
            ));
        }

        info!(count = instruments.len(), exchange, "Instrument dump loaded");
        Ok(instruments)
    }

    /// Confirm the current credential with the profile endpoint.
    ///
    /// A 401/403 maps to `CredentialRejected` so callers can escalate to
    /// rotation; other failures stay generic transport errors.
    pub async fn validate_profile(&self) -> CatalogResult<()> {
        let url = format!("{}/user/profile", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| CatalogError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Profile validation rejected credential");
            return Err(CatalogError::CredentialRejected(format!(
                "HTTP {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::HttpClient(format!("HTTP {status}: {body}")));
        }

        info!("Profile validated");
        Ok(())
    }
}
