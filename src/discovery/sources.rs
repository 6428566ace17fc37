use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SourceError;
use crate::resolver::ResolverContext;
use crate::types::{AgentQuery, AgentRecord, SourceType};
use crate::wellknown::WellKnownClient;

#[async_trait]
pub trait AgentSource: Send + Sync {
    fn name(&self) -> String;
    fn source_type(&self) -> SourceType;
    fn url(&self) -> Option<String> {
        None
    }

    async fn fetch(&self, query: &AgentQuery) -> Result<Vec<AgentRecord>, SourceError>;
}

/// Persistent store records plus internal agents known to the resolver.
pub struct LocalSource {
    resolver: Arc<ResolverContext>,
}

impl LocalSource {
    pub fn new(resolver: Arc<ResolverContext>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl AgentSource for LocalSource {
    fn name(&self) -> String {
        "local".to_string()
    }

    fn source_type(&self) -> SourceType {
        SourceType::Local
    }

    async fn fetch(&self, _query: &AgentQuery) -> Result<Vec<AgentRecord>, SourceError> {
        let mut records = self
            .resolver
            .store()
            .list(None)
            .await
            .map_err(|e| SourceError::Store(e.to_string()))?;
        records.extend(self.resolver.internal_agents());
        Ok(records)
    }
}

/// Agents published in one domain's well-known document.
pub struct WellKnownSource {
    client: WellKnownClient,
    domain: String,
    url: String,
    timeout: Duration,
}

impl WellKnownSource {
    pub fn new(client: WellKnownClient, domain: String, url: String, timeout: Duration) -> Self {
        Self {
            client,
            domain,
            url,
            timeout,
        }
    }
}

#[async_trait]
impl AgentSource for WellKnownSource {
    fn name(&self) -> String {
        format!("wellknown:{}", self.domain)
    }

    fn source_type(&self) -> SourceType {
        SourceType::Wellknown
    }

    fn url(&self) -> Option<String> {
        Some(self.url.clone())
    }

    async fn fetch(&self, _query: &AgentQuery) -> Result<Vec<AgentRecord>, SourceError> {
        let doc = self.client.fetch(&self.url, self.timeout).await?;
        Ok(doc
            .agents
            .into_iter()
            .map(|entry| entry.into_record(Some(&self.domain)))
            .collect())
    }
}

/// Placeholder for a global registry; reports itself as not implemented.
pub struct GlobalRegistrySource;

#[async_trait]
impl AgentSource for GlobalRegistrySource {
    fn name(&self) -> String {
        "global".to_string()
    }

    fn source_type(&self) -> SourceType {
        SourceType::Global
    }

    async fn fetch(&self, _query: &AgentQuery) -> Result<Vec<AgentRecord>, SourceError> {
        Err(SourceError::NotImplemented("global registry"))
    }
}
