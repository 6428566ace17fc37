use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::tables::RecordTable;
use super::{ResolveOutcome, ResolverStrategy};
use crate::error::SourceError;
use crate::storage::AgentStore;
use crate::types::AgentStatus;
use crate::uri::ParsedAgentUri;
use crate::wellknown::WellKnownClient;

pub const DEMO_RESOLVER: &str = "demo";
pub const STORE_RESOLVER: &str = "store";
pub const INTERNAL_RESOLVER: &str = "internal";
pub const RUNTIME_RESOLVER: &str = "runtime";
pub const INTERNAL_WELLKNOWN_RESOLVER: &str = "internal_wellknown";
pub const WELLKNOWN_RESOLVER: &str = "wellknown";
pub const DNS_RESOLVER: &str = "dns";

/// Exact-match lookup in an in-memory table.
pub struct TableResolver {
    id: &'static str,
    table: Arc<RecordTable>,
    default_ttl: u64,
}

impl TableResolver {
    pub fn new(id: &'static str, table: Arc<RecordTable>, default_ttl: u64) -> Self {
        Self {
            id,
            table,
            default_ttl,
        }
    }
}

#[async_trait]
impl ResolverStrategy for TableResolver {
    fn id(&self) -> &str {
        self.id
    }

    async fn resolve(&self, agent_uri: &str, _parsed: &ParsedAgentUri) -> ResolveOutcome {
        match self.table.get(agent_uri) {
            Some(record) => ResolveOutcome::Hit(record.stamped(self.id, self.default_ttl, None)),
            None => ResolveOutcome::Miss,
        }
    }
}

/// Persistent store lookup. Only active records answer.
pub struct StoreResolver {
    store: Arc<dyn AgentStore>,
    default_ttl: u64,
}

impl StoreResolver {
    pub fn new(store: Arc<dyn AgentStore>, default_ttl: u64) -> Self {
        Self { store, default_ttl }
    }
}

#[async_trait]
impl ResolverStrategy for StoreResolver {
    fn id(&self) -> &str {
        STORE_RESOLVER
    }

    async fn resolve(&self, agent_uri: &str, _parsed: &ParsedAgentUri) -> ResolveOutcome {
        match self.store.get(agent_uri).await {
            Ok(Some(record)) if record.status == AgentStatus::Active => {
                ResolveOutcome::Hit(record.stamped(STORE_RESOLVER, self.default_ttl, None))
            }
            Ok(Some(record)) => {
                log::debug!(
                    "stored record for {} is {}, skipping",
                    agent_uri,
                    record.status.as_str()
                );
                ResolveOutcome::Miss
            }
            Ok(None) => ResolveOutcome::Miss,
            Err(e) => ResolveOutcome::Failed(SourceError::Store(e.to_string())),
        }
    }
}

/// Configured internal well-known documents, tried in order; the first match wins.
pub struct InternalWellKnownResolver {
    client: WellKnownClient,
    sources: Vec<String>,
    timeout: Duration,
    default_ttl: u64,
}

impl InternalWellKnownResolver {
    pub fn new(
        client: WellKnownClient,
        sources: Vec<String>,
        timeout: Duration,
        default_ttl: u64,
    ) -> Self {
        Self {
            client,
            sources,
            timeout,
            default_ttl,
        }
    }
}

#[async_trait]
impl ResolverStrategy for InternalWellKnownResolver {
    fn id(&self) -> &str {
        INTERNAL_WELLKNOWN_RESOLVER
    }

    async fn resolve(&self, agent_uri: &str, parsed: &ParsedAgentUri) -> ResolveOutcome {
        let mut last_error = None;

        for url in &self.sources {
            match self.client.fetch(url, self.timeout).await {
                Ok(doc) => {
                    if let Some(entry) = doc.find(agent_uri) {
                        let record = entry
                            .clone()
                            .into_record(Some(&parsed.organization))
                            .stamped(INTERNAL_WELLKNOWN_RESOLVER, self.default_ttl, Some(url.clone()));
                        return ResolveOutcome::Hit(record);
                    }
                }
                Err(e) => {
                    log::warn!("internal well-known source {} failed: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => ResolveOutcome::Failed(e),
            None => ResolveOutcome::Miss,
        }
    }
}

/// Public `/.well-known/agent.json` lookup on the URI's organization.
pub struct PublicWellKnownResolver {
    client: WellKnownClient,
    url_template: String,
    timeout: Duration,
    default_ttl: u64,
}

impl PublicWellKnownResolver {
    pub fn new(
        client: WellKnownClient,
        url_template: String,
        timeout: Duration,
        default_ttl: u64,
    ) -> Self {
        Self {
            client,
            url_template,
            timeout,
            default_ttl,
        }
    }

    pub fn url_for(&self, parsed: &ParsedAgentUri) -> String {
        self.url_template
            .replace("{organization}", &parsed.organization)
    }
}

#[async_trait]
impl ResolverStrategy for PublicWellKnownResolver {
    fn id(&self) -> &str {
        WELLKNOWN_RESOLVER
    }

    async fn resolve(&self, agent_uri: &str, parsed: &ParsedAgentUri) -> ResolveOutcome {
        let url = self.url_for(parsed);
        match self.client.fetch(&url, self.timeout).await {
            Ok(doc) => match doc.find(agent_uri) {
                Some(entry) => ResolveOutcome::Hit(
                    entry
                        .clone()
                        .into_record(Some(&parsed.organization))
                        .stamped(WELLKNOWN_RESOLVER, self.default_ttl, Some(url)),
                ),
                None => ResolveOutcome::Miss,
            },
            Err(e) => ResolveOutcome::Failed(e),
        }
    }
}

/// Reserved for DNS-based resolution; always misses.
pub struct DnsResolver;

#[async_trait]
impl ResolverStrategy for DnsResolver {
    fn id(&self) -> &str {
        DNS_RESOLVER
    }

    async fn resolve(&self, _agent_uri: &str, _parsed: &ParsedAgentUri) -> ResolveOutcome {
        ResolveOutcome::Miss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AgentUpdate, InMemoryAgentStore};
    use crate::types::AgentRecord;
    use crate::uri::parse_agent_uri;

    fn parsed(uri: &str) -> ParsedAgentUri {
        parse_agent_uri(uri).unwrap()
    }

    #[tokio::test]
    async fn test_table_resolver_stamps_provenance() {
        let table = Arc::new(RecordTable::from_records([AgentRecord::new(
            "agent://a.example.com",
            "https://a.example.com",
        )]));
        let resolver = TableResolver::new(DEMO_RESOLVER, table, 300);

        let outcome = resolver
            .resolve("agent://a.example.com", &parsed("agent://a.example.com"))
            .await;
        let record = outcome.into_hit().unwrap();
        let resolution = record.resolution.unwrap();
        assert_eq!(resolution.resolver, "demo");
        assert_eq!(resolution.ttl, 300);
        assert!(!resolution.cached);

        let miss = resolver
            .resolve("agent://b.example.com", &parsed("agent://b.example.com"))
            .await;
        assert!(matches!(miss, ResolveOutcome::Miss));
    }

    #[tokio::test]
    async fn test_store_resolver_requires_active() {
        let store = InMemoryAgentStore::new();
        store
            .add(
                "agent://off.example.com",
                AgentUpdate {
                    endpoint: Some("https://off.example.com".to_string()),
                    status: Some(AgentStatus::Inactive),
                    ..AgentUpdate::default()
                },
            )
            .await
            .unwrap();
        store
            .add(
                "agent://on.example.com",
                AgentUpdate {
                    endpoint: Some("https://on.example.com".to_string()),
                    ..AgentUpdate::default()
                },
            )
            .await
            .unwrap();

        let resolver = StoreResolver::new(Arc::new(store), 300);

        let off = resolver
            .resolve("agent://off.example.com", &parsed("agent://off.example.com"))
            .await;
        assert!(matches!(off, ResolveOutcome::Miss));

        let on = resolver
            .resolve("agent://on.example.com", &parsed("agent://on.example.com"))
            .await;
        assert_eq!(on.into_hit().unwrap().resolution.unwrap().resolver, "store");
    }

    #[test]
    fn test_public_wellknown_url() {
        let resolver = PublicWellKnownResolver::new(
            WellKnownClient::new().unwrap(),
            crate::config::DEFAULT_WELLKNOWN_URL_TEMPLATE.to_string(),
            Duration::from_secs(5),
            300,
        );
        assert_eq!(
            resolver.url_for(&parsed("agent://billing.payments.acme.co.uk")),
            "https://acme.co.uk/.well-known/agent.json"
        );
    }

    #[tokio::test]
    async fn test_dns_always_misses() {
        let outcome = DnsResolver
            .resolve("agent://a.example.com", &parsed("agent://a.example.com"))
            .await;
        assert!(matches!(outcome, ResolveOutcome::Miss));
    }
}
