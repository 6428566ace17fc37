use anyhow::Result;
use futures::future::join_all;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use super::cache::{CachedResolution, ResolutionCache};
use super::chain::{ChainResolution, ResolutionChain};
use super::tables::AgentTables;
use crate::config::ResolverConfig;
use crate::error::ResolutionError;
use crate::storage::AgentStore;
use crate::types::AgentRecord;
use crate::wellknown::WellKnownClient;

/// Owns the resolution chain, its lookup tables and the resolution cache.
pub struct ResolverContext {
    config: RwLock<ResolverConfig>,
    tables: AgentTables,
    store: Arc<dyn AgentStore>,
    client: WellKnownClient,
    chain: RwLock<Arc<ResolutionChain>>,
    cache: ResolutionCache,
}

impl ResolverContext {
    pub fn new(
        config: ResolverConfig,
        store: Arc<dyn AgentStore>,
        client: WellKnownClient,
    ) -> Result<Self> {
        let tables = AgentTables::empty();
        tables.load(&config)?;
        Ok(Self::with_tables(config, tables, store, client))
    }

    /// Uses the given tables as-is instead of loading them from `config`.
    pub fn with_tables(
        config: ResolverConfig,
        tables: AgentTables,
        store: Arc<dyn AgentStore>,
        client: WellKnownClient,
    ) -> Self {
        let chain = ResolutionChain::standard(&config, &tables, store.clone(), client.clone());
        Self {
            config: RwLock::new(config),
            tables,
            store,
            client,
            chain: RwLock::new(Arc::new(chain)),
            cache: ResolutionCache::new(),
        }
    }

    pub fn config(&self) -> ResolverConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn store(&self) -> Arc<dyn AgentStore> {
        self.store.clone()
    }

    pub fn client(&self) -> &WellKnownClient {
        &self.client
    }

    pub fn tables(&self) -> &AgentTables {
        &self.tables
    }

    /// Swaps configuration, reloads static tables, rebuilds the chain and clears the cache.
    pub fn configure(&self, config: ResolverConfig) -> Result<()> {
        self.tables.load(&config)?;
        self.install(config);
        Ok(())
    }

    /// Restores default configuration and built-in tables and drops runtime registrations.
    pub fn reset(&self) -> Result<()> {
        let config = ResolverConfig::default();
        self.tables.load(&config)?;
        self.tables.runtime.clear();
        self.install(config);
        Ok(())
    }

    fn install(&self, config: ResolverConfig) {
        let chain = ResolutionChain::standard(
            &config,
            &self.tables,
            self.store.clone(),
            self.client.clone(),
        );
        *self.chain.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(chain);
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        self.cache.clear();
    }

    pub fn set_internal_agents(&self, records: Vec<AgentRecord>) {
        self.tables.internal.replace(records);
        self.cache.clear();
    }

    pub fn register_internal_agent(&self, record: AgentRecord) {
        self.cache.invalidate(&record.agent_uri);
        self.tables.runtime.insert(record);
    }

    /// Static internal agents (when enabled) followed by runtime registrations.
    pub fn internal_agents(&self) -> Vec<AgentRecord> {
        let mut agents = if self.config().internal_enabled {
            self.tables.internal.list()
        } else {
            Vec::new()
        };
        agents.extend(self.tables.runtime.list());
        agents
    }

    fn current_chain(&self) -> Arc<ResolutionChain> {
        self.chain
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.config().cache_ttl_secs)
    }

    /// Runs the full chain and records the outcome in the cache.
    pub async fn resolve_traced(&self, agent_uri: &str) -> ChainResolution {
        let chain = self.current_chain();
        let resolution = chain.resolve(agent_uri).await;
        self.cache
            .insert(agent_uri, &resolution.result, self.default_ttl());
        resolution
    }

    pub async fn resolve(&self, agent_uri: &str) -> Result<AgentRecord, ResolutionError> {
        self.resolve_traced(agent_uri).await.result
    }

    /// Serves from cache within TTL, otherwise runs the full chain.
    pub async fn resolve_cached(&self, agent_uri: &str) -> CachedResolution {
        if let Some(cached) = self.cache.get(agent_uri) {
            log::debug!("cache hit for {}", agent_uri);
            return cached;
        }
        self.resolve(agent_uri).await
    }

    /// Output order matches input order.
    pub async fn resolve_batch<S: AsRef<str>>(&self, agent_uris: &[S]) -> Vec<CachedResolution> {
        join_all(agent_uris.iter().map(|uri| self.resolve(uri.as_ref()))).await
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryAgentStore;

    fn create_test_context() -> ResolverContext {
        ResolverContext::new(
            ResolverConfig::default(),
            Arc::new(InMemoryAgentStore::new()),
            WellKnownClient::new().unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_demo_agent() {
        let ctx = create_test_context();
        let record = ctx.resolve("agent://hello.dev.pbolduc").await.unwrap();
        assert_eq!(record.resolution.unwrap().resolver, "demo");
        assert_eq!(ctx.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_runtime_registration_resolves() {
        let ctx = create_test_context();
        ctx.register_internal_agent(
            AgentRecord::new("agent://worker.jobs.example.com", "https://jobs.example.com/worker")
                .with_capabilities(["batch"]),
        );

        let record = ctx.resolve("agent://worker.jobs.example.com").await.unwrap();
        assert_eq!(record.resolution.unwrap().resolver, "runtime");
        assert_eq!(ctx.internal_agents().iter().filter(|a| a.has_capability("batch")).count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_internal_table_is_skipped() {
        let ctx = create_test_context();
        let uri = "agent://registry.core.ansregistry.org";
        assert!(ctx.resolve_cached(uri).await.is_ok());

        ctx.configure(ResolverConfig {
            internal_enabled: false,
            wellknown_url_template: "http://127.0.0.1:9/{organization}/agent.json".to_string(),
            request_timeout_ms: 500,
            ..ResolverConfig::default()
        })
        .unwrap();

        assert_eq!(ctx.cache_len(), 0);
        let err = ctx.resolve(uri).await.unwrap_err();
        assert_eq!(err.code.as_u16(), 404);
    }

    #[tokio::test]
    async fn test_reset_drops_runtime_agents() {
        let ctx = create_test_context();
        ctx.register_internal_agent(AgentRecord::new(
            "agent://temp.example.com",
            "https://temp.example.com",
        ));
        ctx.set_internal_agents(Vec::new());
        assert_eq!(ctx.internal_agents().len(), 1);

        ctx.reset().unwrap();
        assert!(ctx.tables().runtime.is_empty());
        assert!(!ctx.tables().internal.is_empty());
    }
}
