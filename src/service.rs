use anyhow::Result;
use std::sync::Arc;

use crate::config::{Config, DiscoveryConfig, HealthConfig};
use crate::discovery::DiscoveryEngine;
use crate::error::ResolutionError;
use crate::health::HealthProbe;
use crate::resolver::{ChainResolution, ResolverContext};
use crate::storage::{AgentStore, InMemoryAgentStore};
use crate::types::{AgentHealthStatus, AgentQuery, AgentRecord, AgentWithHealth, DiscoveryResult};
use crate::wellknown::WellKnownClient;

/// Owned entry point for resolution, discovery and health checks.
///
/// Each instance carries its own caches and configuration, so independent
/// services never share state.
pub struct AgentNameService {
    resolver: Arc<ResolverContext>,
    health: Arc<HealthProbe>,
    discovery: DiscoveryEngine,
}

impl AgentNameService {
    pub fn new(config: Config, store: Arc<dyn AgentStore>) -> Result<Self> {
        config.validate()?;
        let client = WellKnownClient::new()?;
        let resolver = Arc::new(ResolverContext::new(config.resolver, store, client)?);
        let health = Arc::new(HealthProbe::new(config.health)?);
        let discovery = DiscoveryEngine::new(resolver.clone(), health.clone(), config.discovery);

        Ok(Self {
            resolver,
            health,
            discovery,
        })
    }

    /// Default configuration backed by an empty in-memory store.
    pub fn with_defaults() -> Result<Self> {
        Self::new(Config::default(), Arc::new(InMemoryAgentStore::new()))
    }

    pub fn store(&self) -> Arc<dyn AgentStore> {
        self.resolver.store()
    }

    pub fn resolver(&self) -> &ResolverContext {
        &self.resolver
    }

    pub fn config(&self) -> Config {
        Config {
            resolver: self.resolver.config(),
            discovery: self.discovery.config(),
            health: self.health.config(),
        }
    }

    pub async fn resolve(&self, agent_uri: &str) -> Result<AgentRecord, ResolutionError> {
        self.resolver.resolve(agent_uri).await
    }

    pub async fn resolve_traced(&self, agent_uri: &str) -> ChainResolution {
        self.resolver.resolve_traced(agent_uri).await
    }

    pub async fn resolve_cached(&self, agent_uri: &str) -> Result<AgentRecord, ResolutionError> {
        self.resolver.resolve_cached(agent_uri).await
    }

    pub async fn resolve_batch<S: AsRef<str>>(
        &self,
        agent_uris: &[S],
    ) -> Vec<Result<AgentRecord, ResolutionError>> {
        self.resolver.resolve_batch(agent_uris).await
    }

    pub async fn discover(&self, query: &AgentQuery) -> DiscoveryResult {
        self.discovery.discover(query).await
    }

    pub async fn search_agents(&self, text: &str, options: AgentQuery) -> DiscoveryResult {
        self.discovery.search_agents(text, options).await
    }

    pub async fn find_agents_by_capabilities<S: AsRef<str>>(
        &self,
        capabilities: &[S],
        options: AgentQuery,
    ) -> DiscoveryResult {
        self.discovery
            .find_agents_by_capabilities(capabilities, options)
            .await
    }

    pub async fn get_healthy_agents(&self, options: AgentQuery) -> DiscoveryResult {
        self.discovery.get_healthy_agents(options).await
    }

    pub async fn check_agent_health(&self, agent: &AgentRecord) -> AgentHealthStatus {
        self.health.check_agent_health(agent).await
    }

    pub async fn check_multiple_agents_health(&self, agents: &[AgentRecord]) -> Vec<AgentWithHealth> {
        self.health.check_multiple_agents_health(agents).await
    }

    /// Swaps all configuration, rebuilds the chain and clears both caches.
    pub fn configure(&self, config: Config) -> Result<()> {
        config.validate()?;
        self.resolver.configure(config.resolver)?;
        self.discovery.configure(config.discovery);
        self.health.configure(config.health);
        Ok(())
    }

    /// Back to defaults: built-in tables, no runtime agents, empty caches.
    pub fn reset(&self) -> Result<()> {
        self.resolver.reset()?;
        self.discovery.configure(DiscoveryConfig::default());
        self.health.configure(HealthConfig::default());
        Ok(())
    }

    pub fn set_internal_agents(&self, agents: Vec<AgentRecord>) {
        self.resolver.set_internal_agents(agents);
    }

    pub fn register_internal_agent(&self, agent: AgentRecord) {
        self.resolver.register_internal_agent(agent);
    }

    pub fn set_discovery_defaults(&self, config: DiscoveryConfig) {
        self.discovery.configure(config);
    }

    pub fn set_health_defaults(&self, config: HealthConfig) {
        self.health.configure(config);
    }

    pub fn clear_caches(&self) {
        self.resolver.clear_cache();
        self.health.clear_cache();
    }

    pub fn resolution_cache_len(&self) -> usize {
        self.resolver.cache_len()
    }

    pub fn health_cache_len(&self) -> usize {
        self.health.cache_len()
    }
}
