use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AgentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthState {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            HealthState::Healthy
        } else if score >= 50 {
            HealthState::Degraded
        } else {
            HealthState::Unhealthy
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthDetails {
    pub endpoint_reachable: bool,
    pub used_fallback: bool,
    pub tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentHealthStatus {
    pub status: HealthState,
    pub score: u8,
    pub last_check: DateTime<Utc>,
    pub response_time_ms: u64,
    pub error_count: u32,
    /// Not tracked; always `None` until uptime history exists.
    pub uptime_percentage: Option<f64>,
    pub details: HealthDetails,
}

impl AgentHealthStatus {
    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            score: 0,
            last_check: Utc::now(),
            response_time_ms: 0,
            error_count: 1,
            uptime_percentage: None,
            details: HealthDetails {
                last_error: Some(error.into()),
                ..HealthDetails::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentWithHealth {
    #[serde(flatten)]
    pub agent: AgentRecord,
    pub health: AgentHealthStatus,
}
