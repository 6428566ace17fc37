use futures::future::join_all;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::filter::{apply_health_filters, apply_query_filters, deduplicate, truncate};
use super::sources::{AgentSource, GlobalRegistrySource, LocalSource, WellKnownSource};
use crate::config::DiscoveryConfig;
use crate::error::SourceError;
use crate::health::HealthProbe;
use crate::resolver::ResolverContext;
use crate::types::{
    AgentQuery, AgentRecord, DiscoveredAgent, DiscoveryResult, DiscoverySource, DiscoveryStats,
    HealthState, SourceType,
};

struct Gathered {
    source: DiscoverySource,
    records: Vec<AgentRecord>,
}

/// Fans a query out to every enabled source, then merges, filters and ranks.
pub struct DiscoveryEngine {
    resolver: Arc<ResolverContext>,
    health: Arc<HealthProbe>,
    config: RwLock<DiscoveryConfig>,
}

impl DiscoveryEngine {
    pub fn new(
        resolver: Arc<ResolverContext>,
        health: Arc<HealthProbe>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            resolver,
            health,
            config: RwLock::new(config),
        }
    }

    pub fn config(&self) -> DiscoveryConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn configure(&self, config: DiscoveryConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Query organization first, then the configured fallback domains, without repeats.
    pub fn wellknown_domains(&self, query: &AgentQuery) -> Vec<String> {
        let mut domains: Vec<String> = Vec::new();
        let candidates = query
            .organization
            .iter()
            .chain(self.config().fallback_domains.iter())
            .cloned()
            .collect::<Vec<_>>();
        for domain in candidates {
            if !domain.is_empty() && !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        domains
    }

    fn sources_for(&self, query: &AgentQuery, config: &DiscoveryConfig) -> Vec<Box<dyn AgentSource>> {
        let mut sources: Vec<Box<dyn AgentSource>> = Vec::new();

        if query.include_local {
            sources.push(Box::new(LocalSource::new(self.resolver.clone())));
        }

        if query.include_wellknown {
            let resolver_config = self.resolver.config();
            for domain in self.wellknown_domains(query) {
                let url = resolver_config.wellknown_url(&domain);
                sources.push(Box::new(WellKnownSource::new(
                    self.resolver.client().clone(),
                    domain,
                    url,
                    config.source_timeout(),
                )));
            }
        }

        if query.include_global {
            sources.push(Box::new(GlobalRegistrySource));
        }

        sources
    }

    async fn gather_one(source: &dyn AgentSource, query: &AgentQuery, timeout: Duration) -> Gathered {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(timeout, source.fetch(query)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                url: source.url().unwrap_or_else(|| source.name()),
                timeout_ms: timeout.as_millis() as u64,
            }),
        };
        let response_time_ms = started.elapsed().as_millis() as u64;

        let (records, error) = match outcome {
            Ok(records) => (records, None),
            Err(e) => {
                log::warn!("discovery source {} failed: {}", source.name(), e);
                (Vec::new(), Some(e.to_string()))
            }
        };

        Gathered {
            source: DiscoverySource {
                name: source.name(),
                source_type: source.source_type(),
                url: source.url(),
                agents_found: records.len(),
                response_time_ms,
                error,
            },
            records,
        }
    }

    pub async fn discover(&self, query: &AgentQuery) -> DiscoveryResult {
        let started = Instant::now();
        let config = self.config();

        let sources = self.sources_for(query, &config);
        let gathered = join_all(
            sources
                .iter()
                .map(|s| Self::gather_one(s.as_ref(), query, config.source_timeout())),
        )
        .await;

        let mut stats = DiscoveryStats::default();
        let mut candidates = Vec::new();
        let mut source_meta = Vec::with_capacity(gathered.len());
        for Gathered { source, records } in gathered {
            match source.source_type {
                SourceType::Local => stats.local_agents_found += source.agents_found,
                SourceType::Wellknown => stats.wellknown_agents_found += source.agents_found,
                SourceType::Global => stats.global_agents_found += source.agents_found,
                SourceType::Cache => {}
            }
            candidates.extend(records.into_iter().map(|agent| DiscoveredAgent {
                agent,
                discovery_source: source.clone(),
                health: None,
            }));
            source_meta.push(source);
        }

        let deduplicated = deduplicate(candidates);
        let unique_count = deduplicated.len();
        let mut agents = apply_query_filters(deduplicated, query);

        if query.include_health.unwrap_or(config.health_check_enabled) && !agents.is_empty() {
            let records: Vec<AgentRecord> = agents.iter().map(|a| a.agent.clone()).collect();
            let checked = self.health.check_multiple_agents_health(&records).await;
            stats.health_checked = checked.len();
            for (agent, result) in agents.iter_mut().zip(checked) {
                agent.health = Some(result.health);
            }
        }

        let agents = apply_health_filters(agents, query);
        stats.filtered_out = unique_count - agents.len();
        let agents = truncate(agents, query.effective_limit(config.default_limit));

        DiscoveryResult {
            total_found: agents.len(),
            agents,
            sources: source_meta,
            query_time_ms: started.elapsed().as_millis() as u64,
            stats,
        }
    }

    pub async fn search_agents(&self, text: &str, options: AgentQuery) -> DiscoveryResult {
        self.discover(&options.with_search(text)).await
    }

    pub async fn find_agents_by_capabilities<S: AsRef<str>>(
        &self,
        capabilities: &[S],
        options: AgentQuery,
    ) -> DiscoveryResult {
        let query = options.with_capabilities(capabilities.iter().map(|c| c.as_ref().to_string()));
        self.discover(&query).await
    }

    /// Forces a health pass and keeps only agents scored healthy.
    pub async fn get_healthy_agents(&self, options: AgentQuery) -> DiscoveryResult {
        let query = AgentQuery {
            include_health: Some(true),
            health_status: vec![HealthState::Healthy],
            ..options
        };
        self.discover(&query).await
    }
}
