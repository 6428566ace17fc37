use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::SourceError;
use crate::types::{AgentMetadata, AgentRecord, AgentStatus, AgentType};

/// Body of an `agent.json` well-known document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellKnownDocument {
    #[serde(default)]
    pub agents: Vec<WellKnownEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellKnownEntry {
    pub agent_uri: String,
    pub endpoint: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub metadata: Option<AgentMetadata>,
    #[serde(rename = "type", default)]
    pub agent_type: Option<AgentType>,
    #[serde(default)]
    pub status: Option<AgentStatus>,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl WellKnownEntry {
    /// Converts a published entry into a record; `organization` fills a missing one.
    pub fn into_record(self, organization: Option<&str>) -> AgentRecord {
        let mut metadata = self.metadata.unwrap_or_default();
        if metadata.organization.is_none() {
            metadata.organization = organization.map(str::to_string);
        }
        let mut record = AgentRecord::new(self.agent_uri, self.endpoint)
            .with_capabilities(self.capabilities)
            .with_status(self.status.unwrap_or_default())
            .with_type(self.agent_type.unwrap_or_default())
            .with_metadata(metadata);
        if let Some(ttl) = self.ttl.filter(|ttl| *ttl > 0) {
            record = record.stamped("wellknown", ttl, None);
        }
        record
    }
}

impl WellKnownDocument {
    pub fn find(&self, agent_uri: &str) -> Option<&WellKnownEntry> {
        self.agents.iter().find(|a| a.agent_uri == agent_uri)
    }
}

#[derive(Debug, Clone)]
pub struct WellKnownClient {
    client: reqwest::Client,
}

impl WellKnownClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ans-resolver/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Fetches and decodes a well-known document, bounded by `timeout`.
    ///
    /// Timeouts, non-2xx responses and undecodable bodies come back as
    /// [`SourceError`] values; callers treat them as misses.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<WellKnownDocument, SourceError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| SourceError::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response.bytes().await.map_err(|e| SourceError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

            serde_json::from_slice::<WellKnownDocument>(&body).map_err(|e| {
                SourceError::MalformedBody {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            })
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
