use std::time::Duration;

use crate::cache::TtlCache;
use crate::error::ResolutionError;
use crate::types::AgentRecord;

pub type CachedResolution = Result<AgentRecord, ResolutionError>;

/// Positive and negative resolution outcomes keyed by `agent_uri`.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: TtlCache<CachedResolution>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hit on a record comes back marked `cached` with a fresh `resolved_at`.
    pub fn get(&self, agent_uri: &str) -> Option<CachedResolution> {
        self.entries
            .get(agent_uri)
            .map(|entry| entry.map(|record| record.served_from_cache()))
    }

    /// Records use their own TTL; errors and records without one use `default_ttl`.
    pub fn insert(&self, agent_uri: &str, result: &CachedResolution, default_ttl: Duration) {
        let ttl = match result {
            Ok(record) => record.ttl().map(Duration::from_secs).unwrap_or(default_ttl),
            Err(_) => default_ttl,
        };
        self.entries.insert(agent_uri, result.clone(), ttl);
    }

    pub fn invalidate(&self, agent_uri: &str) {
        self.entries.remove(agent_uri);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
