pub mod cache;
pub mod chain;
pub mod context;
pub mod strategies;
pub mod tables;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::AgentRecord;
use crate::uri::ParsedAgentUri;

pub use cache::ResolutionCache;
pub use chain::{AttemptOutcome, ChainResolution, ChainState, ResolutionChain, StrategyAttempt};
pub use context::ResolverContext;
pub use tables::{AgentTables, RecordTable};

/// Result of a single strategy attempt. `Miss` and `Failed` both fall through.
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Hit(AgentRecord),
    Miss,
    Failed(SourceError),
}

impl ResolveOutcome {
    pub fn into_hit(self) -> Option<AgentRecord> {
        match self {
            ResolveOutcome::Hit(record) => Some(record),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ResolverStrategy: Send + Sync {
    fn id(&self) -> &str;

    /// Returns a fully stamped record on a hit. Never panics or errors for
    /// expected failures; those are reported as `Failed`.
    async fn resolve(&self, agent_uri: &str, parsed: &ParsedAgentUri) -> ResolveOutcome;
}
