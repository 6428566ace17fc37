use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use reqwest::{Method, Url};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::score::{compute_score, ScoreThresholds};
use crate::cache::TtlCache;
use crate::config::{HealthConfig, HealthEndpoint, ProbeMethod};
use crate::error::SourceError;
use crate::types::{AgentHealthStatus, AgentRecord, AgentWithHealth, HealthDetails, HealthState};

#[derive(Debug, Clone)]
struct Attempt {
    url: String,
    status: Option<u16>,
    elapsed_ms: u64,
    error: Option<String>,
}

/// Active endpoint prober with its own TTL cache of results.
pub struct HealthProbe {
    client: reqwest::Client,
    config: RwLock<HealthConfig>,
    cache: TtlCache<AgentHealthStatus>,
}

impl HealthProbe {
    pub fn new(config: HealthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ans-resolver/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()?;
        Ok(Self {
            client,
            config: RwLock::new(config),
            cache: TtlCache::new(),
        })
    }

    pub fn config(&self) -> HealthConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn configure(&self, config: HealthConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        self.cache.clear();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cached(&self, agent_uri: &str) -> Option<AgentHealthStatus> {
        self.cache.get(agent_uri)
    }

    /// Returns a cached status within TTL, otherwise probes the agent's endpoint.
    /// Probe failures yield an unhealthy status, never an error.
    pub async fn check_agent_health(&self, agent: &AgentRecord) -> AgentHealthStatus {
        if let Some(status) = self.cache.get(&agent.agent_uri) {
            return status;
        }

        let config = self.config();
        let status = match self.probe(agent, &config).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!("health probe for {} failed: {}", agent.agent_uri, e);
                AgentHealthStatus::unhealthy(e.to_string())
            }
        };

        self.cache
            .insert(agent.agent_uri.clone(), status.clone(), config.cache_ttl());
        status
    }

    /// Checks agents in groups of `batch_size`; output order matches input order.
    pub async fn check_multiple_agents_health(&self, agents: &[AgentRecord]) -> Vec<AgentWithHealth> {
        let batch_size = self.config().batch_size.max(1);
        let mut results = Vec::with_capacity(agents.len());

        for chunk in agents.chunks(batch_size) {
            let statuses = join_all(chunk.iter().map(|agent| self.check_agent_health(agent))).await;
            results.extend(
                chunk
                    .iter()
                    .cloned()
                    .zip(statuses)
                    .map(|(agent, health)| AgentWithHealth { agent, health }),
            );
        }

        results
    }

    async fn probe(&self, agent: &AgentRecord, config: &HealthConfig) -> Result<AgentHealthStatus, SourceError> {
        let base = Url::parse(&agent.endpoint).map_err(|e| SourceError::Transport {
            url: agent.endpoint.clone(),
            message: format!("invalid endpoint URL: {}", e),
        })?;
        let tls = base.scheme() == "https";
        let thresholds = ScoreThresholds::from(config);

        let mut failed = Vec::new();
        for endpoint in &config.endpoints {
            let attempt = self.attempt(&base, endpoint, config.timeout()).await?;
            match attempt.status {
                Some(code) if endpoint.accepts(code) => {
                    return Ok(scored(attempt, failed, false, tls, thresholds));
                }
                _ => failed.push(attempt),
            }
        }

        let fallback = HealthEndpoint {
            path: "/".to_string(),
            method: ProbeMethod::Head,
            accepted_status: config.fallback_accepted.clone(),
        };
        let attempt = self.attempt(&base, &fallback, config.timeout()).await?;
        match attempt.status {
            Some(code) if fallback.accepts(code) => Ok(scored(attempt, failed, true, tls, thresholds)),
            _ => {
                failed.push(attempt);
                Ok(unreachable(failed, tls))
            }
        }
    }

    async fn attempt(
        &self,
        base: &Url,
        endpoint: &HealthEndpoint,
        timeout: Duration,
    ) -> Result<Attempt, SourceError> {
        let url = base.join(&endpoint.path).map_err(|e| SourceError::Transport {
            url: base.to_string(),
            message: format!("cannot join health path {}: {}", endpoint.path, e),
        })?;
        let method = match endpoint.method {
            ProbeMethod::Get => Method::GET,
            ProbeMethod::Head => Method::HEAD,
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.client.request(method, url.clone()).send()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let (status, error) = match outcome {
            Ok(Ok(response)) => (Some(response.status().as_u16()), None),
            Ok(Err(e)) => (None, Some(e.to_string())),
            Err(_) => (
                None,
                Some(
                    SourceError::Timeout {
                        url: url.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    }
                    .to_string(),
                ),
            ),
        };

        Ok(Attempt {
            url: url.to_string(),
            status,
            elapsed_ms,
            error,
        })
    }
}

fn last_error(failed: &[Attempt]) -> Option<String> {
    failed.iter().rev().find_map(|a| {
        a.error
            .clone()
            .or_else(|| a.status.map(|s| format!("{} responded with HTTP {}", a.url, s)))
    })
}

fn scored(
    winner: Attempt,
    failed: Vec<Attempt>,
    used_fallback: bool,
    tls: bool,
    thresholds: ScoreThresholds,
) -> AgentHealthStatus {
    let error_count = failed.len() as u32;
    let score = compute_score(winner.elapsed_ms, error_count, thresholds);
    AgentHealthStatus {
        status: HealthState::from_score(score),
        score,
        last_check: Utc::now(),
        response_time_ms: winner.elapsed_ms,
        error_count,
        uptime_percentage: None,
        details: HealthDetails {
            endpoint_reachable: true,
            used_fallback,
            tls,
            checked_url: Some(winner.url),
            http_status: winner.status,
            last_error: last_error(&failed),
        },
    }
}

fn unreachable(failed: Vec<Attempt>, tls: bool) -> AgentHealthStatus {
    let last = failed.last().cloned();
    AgentHealthStatus {
        status: HealthState::Unhealthy,
        score: 0,
        last_check: Utc::now(),
        response_time_ms: last.as_ref().map(|a| a.elapsed_ms).unwrap_or(0),
        error_count: failed.len() as u32,
        uptime_percentage: None,
        details: HealthDetails {
            endpoint_reachable: failed.iter().any(|a| a.status.is_some()),
            used_fallback: true,
            tls,
            checked_url: last.as_ref().map(|a| a.url.clone()),
            http_status: last.and_then(|a| a.status),
            last_error: last_error(&failed),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(status: Option<u16>, elapsed_ms: u64) -> Attempt {
        Attempt {
            url: "http://127.0.0.1/health".to_string(),
            status,
            elapsed_ms,
            error: None,
        }
    }

    #[test]
    fn test_scored_after_failures() {
        let status = scored(
            attempt(Some(200), 120),
            vec![attempt(Some(404), 10), attempt(Some(503), 10)],
            false,
            false,
            ScoreThresholds::default(),
        );
        assert_eq!(status.score, 80);
        assert_eq!(status.status, HealthState::Healthy);
        assert_eq!(status.error_count, 2);
        assert!(status.details.last_error.unwrap().contains("503"));
    }

    #[test]
    fn test_unreachable_is_zero() {
        let status = unreachable(vec![attempt(None, 5), attempt(Some(404), 7)], true);
        assert_eq!(status.score, 0);
        assert_eq!(status.status, HealthState::Unhealthy);
        assert_eq!(status.response_time_ms, 7);
        assert!(status.details.endpoint_reachable);
        assert!(status.details.tls);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_unhealthy_and_cached() {
        let probe = HealthProbe::new(HealthConfig::default()).unwrap();
        let agent = AgentRecord::new("agent://broken.example.com", "not a url");

        let status = probe.check_agent_health(&agent).await;
        assert_eq!(status.status, HealthState::Unhealthy);
        assert!(status.details.last_error.unwrap().contains("invalid endpoint URL"));
        assert!(probe.cached("agent://broken.example.com").is_some());
    }

    #[tokio::test]
    async fn test_batch_preserves_positions() {
        let probe = HealthProbe::new(HealthConfig {
            batch_size: 2,
            ..HealthConfig::default()
        })
        .unwrap();
        let agents: Vec<AgentRecord> = (0..5)
            .map(|i| AgentRecord::new(format!("agent://a{}.example.com", i), "::bad::"))
            .collect();

        let results = probe.check_multiple_agents_health(&agents).await;
        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.agent.agent_uri, format!("agent://a{}.example.com", i));
            assert_eq!(result.health.status, HealthState::Unhealthy);
        }
    }
}
