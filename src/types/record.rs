use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_RESOLUTION_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
    Maintenance,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Suspended => "suspended",
            AgentStatus::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryLevel {
    Public,
    Internal,
    Private,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    #[default]
    Persistent,
    Ephemeral,
    System,
    Personal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_level: Option<DiscoveryLevel>,
}

/// Provenance of a successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionInfo {
    pub ttl: u64,
    #[serde(default)]
    pub cached: bool,
    pub resolver: String,
    pub resolved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_uri: String,
    pub endpoint: String,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub metadata: AgentMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionInfo>,
    #[serde(rename = "type", default)]
    pub agent_type: AgentType,
}

impl AgentRecord {
    pub fn new(agent_uri: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            agent_uri: agent_uri.into(),
            endpoint: endpoint.into(),
            status: AgentStatus::Active,
            capabilities: BTreeSet::new(),
            metadata: AgentMetadata::default(),
            resolution: None,
            agent_type: AgentType::Persistent,
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_metadata(mut self, metadata: AgentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = agent_type;
        self
    }

    /// TTL carried by the record itself, if any.
    pub fn ttl(&self) -> Option<u64> {
        self.resolution.as_ref().map(|r| r.ttl).filter(|ttl| *ttl > 0)
    }

    /// Returns a copy stamped with fresh provenance for `resolver`.
    ///
    /// A TTL already present on the record wins over `default_ttl`.
    pub fn stamped(&self, resolver: &str, default_ttl: u64, source: Option<String>) -> Self {
        let ttl = self.ttl().unwrap_or(default_ttl);
        let method = self.resolution.as_ref().and_then(|r| r.method.clone());
        Self {
            resolution: Some(ResolutionInfo {
                ttl,
                cached: false,
                resolver: resolver.to_string(),
                resolved_at: Utc::now(),
                method,
                source: source.or_else(|| self.resolution.as_ref().and_then(|r| r.source.clone())),
            }),
            ..self.clone()
        }
    }

    /// Returns a copy marked as served from cache with a refreshed `resolved_at`.
    pub fn served_from_cache(&self) -> Self {
        let mut record = self.clone();
        if let Some(resolution) = record.resolution.as_mut() {
            resolution.cached = true;
            resolution.resolved_at = Utc::now();
        }
        record
    }

    pub fn organization(&self) -> Option<&str> {
        self.metadata.organization.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.description.as_deref()
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}
