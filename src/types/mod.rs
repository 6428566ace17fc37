pub mod health;
pub mod query;
pub mod record;

pub use health::{AgentHealthStatus, AgentWithHealth, HealthDetails, HealthState};
pub use query::{
    AgentQuery, DiscoveredAgent, DiscoveryResult, DiscoverySource, DiscoveryStats, SourceType,
};
pub use record::{
    AgentMetadata, AgentRecord, AgentStatus, AgentType, DiscoveryLevel, ResolutionInfo,
    DEFAULT_RESOLUTION_TTL_SECS,
};
