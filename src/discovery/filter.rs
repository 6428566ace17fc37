use std::collections::HashSet;

use crate::types::{AgentQuery, AgentRecord, DiscoveredAgent};
use crate::uri::parse_agent_uri;

/// Keeps the highest-priority occurrence of each `agent_uri`.
///
/// Candidates are stably sorted by source priority first, so ties keep
/// gather order.
pub fn deduplicate(mut candidates: Vec<DiscoveredAgent>) -> Vec<DiscoveredAgent> {
    candidates.sort_by_key(|c| c.discovery_source.source_type.priority());
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.agent.agent_uri.clone()))
        .collect()
}

/// Organization from metadata, else the one encoded in the URI.
pub fn record_organization(record: &AgentRecord) -> Option<String> {
    record
        .organization()
        .map(str::to_string)
        .or_else(|| parse_agent_uri(&record.agent_uri).map(|p| p.organization))
}

pub fn matches_status(record: &AgentRecord, query: &AgentQuery) -> bool {
    query.status.is_empty() || query.status.contains(&record.status)
}

pub fn matches_discovery_level(record: &AgentRecord, query: &AgentQuery) -> bool {
    match record.metadata.discovery_level {
        Some(level) => query.discovery_level.is_empty() || query.discovery_level.contains(&level),
        None => true,
    }
}

pub fn matches_type(record: &AgentRecord, query: &AgentQuery) -> bool {
    query.agent_type.is_empty() || query.agent_type.contains(&record.agent_type)
}

pub fn matches_capabilities(record: &AgentRecord, query: &AgentQuery) -> bool {
    query
        .capabilities
        .iter()
        .all(|capability| record.has_capability(capability))
}

pub fn matches_organization(record: &AgentRecord, query: &AgentQuery) -> bool {
    match &query.organization {
        Some(organization) => record_organization(record).as_deref() == Some(organization.as_str()),
        None => true,
    }
}

pub fn matches_search(record: &AgentRecord, query: &AgentQuery) -> bool {
    let needle = match query.search.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_lowercase(),
        _ => return true,
    };

    record.agent_uri.to_lowercase().contains(&needle)
        || record
            .description()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
        || record
            .capabilities
            .iter()
            .any(|c| c.to_lowercase().contains(&needle))
}

/// Declarative query filters, applied in a fixed order.
pub fn apply_query_filters(agents: Vec<DiscoveredAgent>, query: &AgentQuery) -> Vec<DiscoveredAgent> {
    let predicates: [fn(&AgentRecord, &AgentQuery) -> bool; 6] = [
        matches_status,
        matches_discovery_level,
        matches_type,
        matches_capabilities,
        matches_organization,
        matches_search,
    ];

    predicates.iter().fold(agents, |agents, predicate| {
        agents
            .into_iter()
            .filter(|a| predicate(&a.agent, query))
            .collect()
    })
}

/// Health status membership and minimum score. Agents without a health result pass.
pub fn apply_health_filters(agents: Vec<DiscoveredAgent>, query: &AgentQuery) -> Vec<DiscoveredAgent> {
    agents
        .into_iter()
        .filter(|a| match &a.health {
            Some(health) => {
                let status_ok =
                    query.health_status.is_empty() || query.health_status.contains(&health.status);
                let score_ok = query.min_health_score.map_or(true, |min| health.score >= min);
                status_ok && score_ok
            }
            None => true,
        })
        .collect()
}

pub fn truncate(mut agents: Vec<DiscoveredAgent>, limit: Option<usize>) -> Vec<DiscoveredAgent> {
    if let Some(limit) = limit {
        agents.truncate(limit);
    }
    agents
}
