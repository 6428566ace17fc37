use serde::Serialize;
use std::sync::Arc;

use super::strategies::{
    DnsResolver, InternalWellKnownResolver, PublicWellKnownResolver, StoreResolver, TableResolver,
    DEMO_RESOLVER, INTERNAL_RESOLVER, RUNTIME_RESOLVER,
};
use super::tables::AgentTables;
use super::{ResolveOutcome, ResolverStrategy};
use crate::config::ResolverConfig;
use crate::error::ResolutionError;
use crate::storage::AgentStore;
use crate::types::AgentRecord;
use crate::uri::{parse_agent_uri, validate_agent_uri};
use crate::wellknown::WellKnownClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    Validating,
    Resolving,
    Found,
    NotFound,
    /// Validation failed; no strategy ran.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Hit,
    Miss,
    Failed { cause: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyAttempt {
    pub resolver: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone)]
pub struct ChainResolution {
    pub state: ChainState,
    pub result: Result<AgentRecord, ResolutionError>,
    pub attempts: Vec<StrategyAttempt>,
}

/// Ordered resolver strategies, tried until one produces a record.
pub struct ResolutionChain {
    strategies: Vec<Box<dyn ResolverStrategy>>,
}

impl ResolutionChain {
    pub fn new(strategies: Vec<Box<dyn ResolverStrategy>>) -> Self {
        Self { strategies }
    }

    /// Builds the standard priority order: demo table, persistent store,
    /// static internal table (when enabled), runtime registrations, internal
    /// well-known sources, public well-known, DNS.
    pub fn standard(
        config: &ResolverConfig,
        tables: &AgentTables,
        store: Arc<dyn AgentStore>,
        client: WellKnownClient,
    ) -> Self {
        let ttl = config.cache_ttl_secs;
        let mut strategies: Vec<Box<dyn ResolverStrategy>> = vec![
            Box::new(TableResolver::new(DEMO_RESOLVER, tables.demo.clone(), ttl)),
            Box::new(StoreResolver::new(store, ttl)),
        ];

        if config.internal_enabled {
            strategies.push(Box::new(TableResolver::new(
                INTERNAL_RESOLVER,
                tables.internal.clone(),
                ttl,
            )));
        }

        strategies.push(Box::new(TableResolver::new(
            RUNTIME_RESOLVER,
            tables.runtime.clone(),
            ttl,
        )));

        if !config.internal_sources.is_empty() {
            strategies.push(Box::new(InternalWellKnownResolver::new(
                client.clone(),
                config.internal_sources.clone(),
                config.request_timeout(),
                ttl,
            )));
        }

        strategies.push(Box::new(PublicWellKnownResolver::new(
            client,
            config.wellknown_url_template.clone(),
            config.request_timeout(),
            ttl,
        )));
        strategies.push(Box::new(DnsResolver));

        Self::new(strategies)
    }

    pub fn resolver_ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub async fn resolve(&self, agent_uri: &str) -> ChainResolution {
        let mut state = ChainState::Validating;
        log::debug!("{:?} {}", state, agent_uri);

        let parsed = match parse_agent_uri(agent_uri).filter(|_| validate_agent_uri(agent_uri)) {
            Some(parsed) => parsed,
            None => {
                return ChainResolution {
                    state: ChainState::Rejected,
                    result: Err(ResolutionError::invalid_uri(agent_uri)),
                    attempts: Vec::new(),
                };
            }
        };

        state = ChainState::Resolving;
        log::debug!("{:?} {}", state, agent_uri);

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let resolver = strategy.id().to_string();
            match strategy.resolve(agent_uri, &parsed).await {
                ResolveOutcome::Hit(record) => {
                    log::info!("resolved {} via {} -> {}", agent_uri, resolver, record.endpoint);
                    attempts.push(StrategyAttempt {
                        resolver,
                        outcome: AttemptOutcome::Hit,
                    });
                    return ChainResolution {
                        state: ChainState::Found,
                        result: Ok(record),
                        attempts,
                    };
                }
                ResolveOutcome::Miss => {
                    log::debug!("{} missed {}", resolver, agent_uri);
                    attempts.push(StrategyAttempt {
                        resolver,
                        outcome: AttemptOutcome::Miss,
                    });
                }
                ResolveOutcome::Failed(e) => {
                    log::warn!("{} failed for {}: {}", resolver, agent_uri, e);
                    attempts.push(StrategyAttempt {
                        resolver,
                        outcome: AttemptOutcome::Failed {
                            cause: e.to_string(),
                        },
                    });
                }
            }
        }

        let tried: Vec<&str> = attempts.iter().map(|a| a.resolver.as_str()).collect();
        let error = ResolutionError::not_found(agent_uri, &tried);
        ChainResolution {
            state: ChainState::NotFound,
            result: Err(error),
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::uri::ParsedAgentUri;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStrategy {
        id: &'static str,
        outcome: fn(&str) -> ResolveOutcome,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ResolverStrategy for FixedStrategy {
        fn id(&self) -> &str {
            self.id
        }

        async fn resolve(&self, agent_uri: &str, _parsed: &ParsedAgentUri) -> ResolveOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)(agent_uri)
        }
    }

    fn strategy(
        id: &'static str,
        outcome: fn(&str) -> ResolveOutcome,
    ) -> (Box<dyn ResolverStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(FixedStrategy {
                id,
                outcome,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn hit(uri: &str) -> ResolveOutcome {
        ResolveOutcome::Hit(AgentRecord::new(uri, "https://hit.example.com").stamped("second", 300, None))
    }

    fn miss(_uri: &str) -> ResolveOutcome {
        ResolveOutcome::Miss
    }

    fn failed(_uri: &str) -> ResolveOutcome {
        ResolveOutcome::Failed(SourceError::Store("disk unavailable".to_string()))
    }

    #[tokio::test]
    async fn test_first_hit_stops_chain() {
        let (first, first_calls) = strategy("first", failed);
        let (second, second_calls) = strategy("second", hit);
        let (third, third_calls) = strategy("third", hit);
        let chain = ResolutionChain::new(vec![first, second, third]);

        let resolution = chain.resolve("agent://a.example.com").await;

        assert_eq!(resolution.state, ChainState::Found);
        assert_eq!(resolution.result.unwrap().endpoint, "https://hit.example.com");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolution.attempts.len(), 2);
        assert!(matches!(
            resolution.attempts[0].outcome,
            AttemptOutcome::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_uri_runs_no_strategy() {
        let (only, calls) = strategy("only", hit);
        let chain = ResolutionChain::new(vec![only]);

        let resolution = chain.resolve("invalid-uri").await;

        assert_eq!(resolution.state, ChainState::Rejected);
        assert_eq!(resolution.result.unwrap_err().code.as_u16(), 400);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(resolution.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_all_miss_is_not_found() {
        let (a, _) = strategy("a", miss);
        let (b, _) = strategy("b", failed);
        let chain = ResolutionChain::new(vec![a, b]);

        let resolution = chain.resolve("agent://nonexistent.nowhere.com").await;

        assert_eq!(resolution.state, ChainState::NotFound);
        let err = resolution.result.unwrap_err();
        assert_eq!(err.code.as_u16(), 404);
        assert!(err.message.contains("a, b"));
    }

    #[test]
    fn test_standard_order() {
        let tables = AgentTables::empty();
        let store = Arc::new(crate::storage::InMemoryAgentStore::new());
        let client = WellKnownClient::new().unwrap();

        let config = ResolverConfig {
            internal_sources: vec!["https://agents.internal/agent.json".to_string()],
            ..ResolverConfig::default()
        };
        let chain = ResolutionChain::standard(&config, &tables, store.clone(), client.clone());
        assert_eq!(
            chain.resolver_ids(),
            vec!["demo", "store", "internal", "runtime", "internal_wellknown", "wellknown", "dns"]
        );

        let config = ResolverConfig {
            internal_enabled: false,
            ..ResolverConfig::default()
        };
        let chain = ResolutionChain::standard(&config, &tables, store, client);
        assert_eq!(
            chain.resolver_ids(),
            vec!["demo", "store", "runtime", "wellknown", "dns"]
        );
    }
}
