use serde::{Deserialize, Serialize};

use super::{AgentHealthStatus, AgentRecord, AgentStatus, AgentType, DiscoveryLevel, HealthState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentQuery {
    /// Every listed capability must be present on the agent.
    pub capabilities: Vec<String>,
    pub organization: Option<String>,
    pub status: Vec<AgentStatus>,
    pub discovery_level: Vec<DiscoveryLevel>,
    pub health_status: Vec<HealthState>,
    #[serde(rename = "type")]
    pub agent_type: Vec<AgentType>,
    pub min_health_score: Option<u8>,
    pub search: Option<String>,
    pub include_local: bool,
    pub include_wellknown: bool,
    pub include_global: bool,
    /// Overrides the engine-wide health flag for this query.
    pub include_health: Option<bool>,
    /// Zero or negative means unbounded; `None` takes the engine's default.
    pub limit: Option<i64>,
}

impl Default for AgentQuery {
    fn default() -> Self {
        Self {
            capabilities: Vec::new(),
            organization: None,
            status: vec![AgentStatus::Active],
            discovery_level: vec![
                DiscoveryLevel::Public,
                DiscoveryLevel::Internal,
                DiscoveryLevel::Private,
            ],
            health_status: Vec::new(),
            agent_type: Vec::new(),
            min_health_score: None,
            search: None,
            include_local: true,
            include_wellknown: false,
            include_global: false,
            include_health: None,
            limit: None,
        }
    }
}

impl AgentQuery {
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The query's own limit, else `default_limit`. Non-positive means unbounded.
    pub fn effective_limit(&self, default_limit: i64) -> Option<usize> {
        match self.limit.unwrap_or(default_limit) {
            limit if limit <= 0 => None,
            limit => Some(limit as usize),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Local,
    Wellknown,
    Global,
    Cache,
}

impl SourceType {
    /// Lower rank wins during deduplication.
    pub fn priority(&self) -> u8 {
        match self {
            SourceType::Local => 1,
            SourceType::Wellknown => 2,
            SourceType::Global => 3,
            SourceType::Cache => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySource {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub agents_found: usize,
    pub response_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredAgent {
    #[serde(flatten)]
    pub agent: AgentRecord,
    pub discovery_source: DiscoverySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<AgentHealthStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    pub local_agents_found: usize,
    pub wellknown_agents_found: usize,
    pub global_agents_found: usize,
    pub filtered_out: usize,
    pub health_checked: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub agents: Vec<DiscoveredAgent>,
    pub total_found: usize,
    pub sources: Vec<DiscoverySource>,
    pub query_time_ms: u64,
    pub stats: DiscoveryStats,
}

impl DiscoveryResult {
    pub fn agent_uris(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.agent.agent_uri.as_str()).collect()
    }

    pub fn source(&self, source_type: SourceType) -> impl Iterator<Item = &DiscoverySource> {
        self.sources
            .iter()
            .filter(move |s| s.source_type == source_type)
    }
}
