use crate::config::HealthConfig;

const MAX_SCORE: u8 = 100;
const SLOW_PENALTY: u8 = 25;
const VERY_SLOW_PENALTY: u8 = 50;
const FAILED_ATTEMPT_PENALTY: u32 = 10;
const MAX_FAILED_ATTEMPT_PENALTY: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreThresholds {
    pub degraded_ms: u64,
    pub unhealthy_ms: u64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            degraded_ms: 2000,
            unhealthy_ms: 5000,
        }
    }
}

impl From<&HealthConfig> for ScoreThresholds {
    fn from(config: &HealthConfig) -> Self {
        Self {
            degraded_ms: config.degraded_threshold_ms,
            unhealthy_ms: config.unhealthy_threshold_ms,
        }
    }
}

/// Scores a reachable endpoint from its response time and the number of
/// attempts that failed before one succeeded.
pub fn compute_score(response_time_ms: u64, failed_attempts: u32, thresholds: ScoreThresholds) -> u8 {
    let latency_penalty = if response_time_ms > thresholds.unhealthy_ms {
        VERY_SLOW_PENALTY
    } else if response_time_ms > thresholds.degraded_ms {
        SLOW_PENALTY
    } else {
        0
    };

    let attempt_penalty = failed_attempts
        .saturating_mul(FAILED_ATTEMPT_PENALTY)
        .min(MAX_FAILED_ATTEMPT_PENALTY) as u8;

    MAX_SCORE
        .saturating_sub(latency_penalty)
        .saturating_sub(attempt_penalty)
}
