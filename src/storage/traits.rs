use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{AgentMetadata, AgentRecord, AgentStatus, AgentType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreFilter {
    pub status: Option<AgentStatus>,
    pub organization: Option<String>,
    pub capability: Option<String>,
}

impl StoreFilter {
    pub fn matches(&self, record: &AgentRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(organization) = &self.organization {
            if record.organization() != Some(organization.as_str()) {
                return false;
            }
        }
        if let Some(capability) = &self.capability {
            if !record.has_capability(capability) {
                return false;
            }
        }
        true
    }
}

/// Fields supplied to [`AgentStore::add`]. Unset fields keep the previous value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentUpdate {
    pub endpoint: Option<String>,
    pub status: Option<AgentStatus>,
    pub capabilities: Option<BTreeSet<String>>,
    pub metadata: Option<AgentMetadata>,
    #[serde(rename = "type")]
    pub agent_type: Option<AgentType>,
}

impl AgentUpdate {
    /// Builds the record that replaces `previous` (or creates one when absent).
    pub fn merge_over(self, agent_uri: &str, previous: Option<&AgentRecord>) -> Result<AgentRecord> {
        let now = Utc::now();
        let base = match previous {
            Some(record) => record.clone(),
            None => {
                let endpoint = self
                    .endpoint
                    .clone()
                    .ok_or_else(|| anyhow!("endpoint is required to create {}", agent_uri))?;
                let mut record = AgentRecord::new(agent_uri, endpoint);
                record.metadata.created_at = Some(now);
                record
            }
        };

        let mut metadata = match self.metadata {
            Some(update) => AgentMetadata {
                organization: update.organization.or(base.metadata.organization.clone()),
                description: update.description.or(base.metadata.description.clone()),
                contact: update.contact.or(base.metadata.contact.clone()),
                version: update.version.or(base.metadata.version.clone()),
                created_at: base.metadata.created_at.or(update.created_at),
                updated_at: None,
                discovery_level: update.discovery_level.or(base.metadata.discovery_level),
            },
            None => base.metadata.clone(),
        };
        metadata.updated_at = Some(now);

        Ok(AgentRecord {
            agent_uri: agent_uri.to_string(),
            endpoint: self.endpoint.unwrap_or(base.endpoint),
            status: self.status.unwrap_or(base.status),
            capabilities: self.capabilities.unwrap_or(base.capabilities),
            metadata,
            resolution: base.resolution,
            agent_type: self.agent_type.unwrap_or(base.agent_type),
        })
    }
}

impl From<AgentRecord> for AgentUpdate {
    fn from(record: AgentRecord) -> Self {
        Self {
            endpoint: Some(record.endpoint),
            status: Some(record.status),
            capabilities: Some(record.capabilities),
            metadata: Some(record.metadata),
            agent_type: Some(record.agent_type),
        }
    }
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get(&self, agent_uri: &str) -> Result<Option<AgentRecord>>;
    async fn list(&self, filter: Option<&StoreFilter>) -> Result<Vec<AgentRecord>>;
    async fn add(&self, agent_uri: &str, update: AgentUpdate) -> Result<AgentRecord>;
    async fn remove(&self, agent_uri: &str) -> Result<bool>;
}
