//! Roster providers.
//!
//! The roster is the list of entities that can be banned or picked. An
//! endpoint loads it once before joining; see [`load_roster`].

use crate::errors::ClientError;

use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use draft_core::roster::RosterEntry;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default timeout for roster requests in seconds.
const ROSTER_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Status the roster API reports in its body on success.
const ROSTER_OK_CODE: i64 = 200;

#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, ClientError>;
}

/// Fetch the roster, refusing an empty one.
///
/// # Errors
///
/// `RosterUnavailable` when the provider fails or returns nothing.
pub async fn load_roster(provider: &dyn RosterProvider) -> Result<Vec<RosterEntry>, ClientError> {
    let roster = provider.fetch_roster().await?;
    if roster.is_empty() {
        return Err(ClientError::RosterUnavailable(
            "roster is empty".to_string(),
        ));
    }
    info!(target: "draft.client.roster", entries = roster.len(), "Roster loaded");
    Ok(roster)
}

#[derive(Debug, Deserialize)]
struct RosterResponse {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Vec<RosterItem>,
}

#[derive(Debug, Deserialize)]
struct RosterItem {
    code: u32,
    name: String,
}

/// Roster fetched over HTTP with an `x-api-key` header.
pub struct HttpRosterProvider {
    client: Client,
    url: String,
    api_key: SecretString,
}

impl HttpRosterProvider {
    /// # Errors
    ///
    /// `Config` if the HTTP client cannot be built.
    pub fn new(url: String, api_key: SecretString) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(ROSTER_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl RosterProvider for HttpRosterProvider {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, ClientError> {
        let response = self
            .client
            .get(&self.url)
            .header("x-api-key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!(target: "draft.client.roster", error = %e, "Roster request failed");
                ClientError::RosterUnavailable("roster service is unreachable".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "draft.client.roster", status = %status, "Roster request rejected");
            return Err(ClientError::RosterUnavailable(format!("HTTP {status}")));
        }

        let body: RosterResponse = response.json().await.map_err(|e| {
            warn!(target: "draft.client.roster", error = %e, "Malformed roster response");
            ClientError::RosterUnavailable("malformed roster response".to_string())
        })?;

        if body.code != ROSTER_OK_CODE {
            warn!(
                target: "draft.client.roster",
                code = body.code,
                message = %body.message,
                "Roster service reported an error"
            );
            return Err(ClientError::RosterUnavailable(body.message));
        }

        Ok(body
            .data
            .into_iter()
            .map(|item| RosterEntry::new(item.code, item.name))
            .collect())
    }
}

/// Fixed roster, for tests and offline use.
#[derive(Debug, Clone, Default)]
pub struct StaticRosterProvider {
    entries: Vec<RosterEntry>,
}

impl StaticRosterProvider {
    #[must_use]
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl RosterProvider for StaticRosterProvider {
    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, ClientError> {
        Ok(self.entries.clone())
    }
}
