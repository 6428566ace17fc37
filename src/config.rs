use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::DEFAULT_RESOLUTION_TTL_SECS;

pub const DEFAULT_WELLKNOWN_URL_TEMPLATE: &str = "https://{organization}/.well-known/agent.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub discovery: DiscoveryConfig,
    pub health: HealthConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub cache_ttl_secs: u64,
    pub request_timeout_ms: u64,
    pub internal_enabled: bool,
    /// Absolute well-known document URLs, queried in order.
    pub internal_sources: Vec<String>,
    pub wellknown_url_template: String,
    pub demo_agents_path: Option<PathBuf>,
    pub internal_agents_path: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_RESOLUTION_TTL_SECS,
            request_timeout_ms: 5000,
            internal_enabled: true,
            internal_sources: Vec::new(),
            wellknown_url_template: DEFAULT_WELLKNOWN_URL_TEMPLATE.to_string(),
            demo_agents_path: None,
            internal_agents_path: None,
        }
    }
}

impl ResolverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn wellknown_url(&self, organization: &str) -> String {
        self.wellknown_url_template
            .replace("{organization}", organization)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub health_check_enabled: bool,
    /// Domains always scanned by well-known discovery, after the query's organization.
    pub fallback_domains: Vec<String>,
    pub default_limit: i64,
    pub source_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            health_check_enabled: false,
            fallback_domains: Vec::new(),
            default_limit: 100,
            source_timeout_ms: 5000,
        }
    }
}

impl DiscoveryConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    Get,
    Head,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEndpoint {
    pub path: String,
    pub method: ProbeMethod,
    pub accepted_status: Vec<u16>,
}

impl HealthEndpoint {
    pub fn new(path: &str, method: ProbeMethod, accepted_status: &[u16]) -> Self {
        Self {
            path: path.to_string(),
            method,
            accepted_status: accepted_status.to_vec(),
        }
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.accepted_status.contains(&status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub batch_size: usize,
    pub endpoints: Vec<HealthEndpoint>,
    /// Status codes accepted by the final root HEAD probe.
    pub fallback_accepted: Vec<u16>,
    pub degraded_threshold_ms: u64,
    pub unhealthy_threshold_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            cache_ttl_secs: 60,
            batch_size: 5,
            endpoints: vec![
                HealthEndpoint::new("/health", ProbeMethod::Get, &[200]),
                HealthEndpoint::new("/status", ProbeMethod::Get, &[200]),
                HealthEndpoint::new("/", ProbeMethod::Head, &[200, 204]),
            ],
            fallback_accepted: vec![200, 204, 405],
            degraded_threshold_ms: 2000,
            unhealthy_threshold_ms: 5000,
        }
    }
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Loads TOML or YAML by extension, then applies environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let mut config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("parsing TOML config {}", path.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("parsing YAML config {}", path.display()))?,
            other => bail!(
                "unsupported config format {:?} for {}; use .toml, .yaml or .yml",
                other,
                path.display()
            ),
        };
        config.validate()?;
        config.apply_env();
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.health.batch_size == 0 {
            bail!("health.batch_size must be at least 1");
        }
        if !self.resolver.wellknown_url_template.contains("{organization}") {
            bail!("resolver.wellknown_url_template must contain {{organization}}");
        }
        if self.resolver.cache_ttl_secs == 0 {
            bail!("resolver.cache_ttl_secs must be greater than zero");
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_parse("ANS_CACHE_TTL_SECS") {
            self.resolver.cache_ttl_secs = v;
        }
        if let Some(v) = env_parse("ANS_REQUEST_TIMEOUT_MS") {
            self.resolver.request_timeout_ms = v;
        }
        if let Some(v) = env_parse("ANS_INTERNAL_ENABLED") {
            self.resolver.internal_enabled = v;
        }
        if let Some(v) = env_list("ANS_INTERNAL_SOURCES") {
            self.resolver.internal_sources = v;
        }
        if let Ok(v) = std::env::var("ANS_WELLKNOWN_URL_TEMPLATE") {
            self.resolver.wellknown_url_template = v;
        }
        if let Some(v) = env_parse("ANS_DISCOVERY_HEALTH") {
            self.discovery.health_check_enabled = v;
        }
        if let Some(v) = env_list("ANS_FALLBACK_DOMAINS") {
            self.discovery.fallback_domains = v;
        }
        if let Some(v) = env_parse("ANS_HEALTH_TIMEOUT_MS") {
            self.health.timeout_ms = v;
        }
        if let Some(v) = env_parse("ANS_HEALTH_CACHE_TTL_SECS") {
            self.health.cache_ttl_secs = v;
        }
        if let Some(v) = env_parse::<usize>("ANS_HEALTH_BATCH_SIZE") {
            self.health.batch_size = v.max(1);
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|s| {
        s.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    })
}
