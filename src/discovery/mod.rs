pub mod engine;
pub mod filter;
pub mod sources;

pub use engine::DiscoveryEngine;
pub use sources::{AgentSource, GlobalRegistrySource, LocalSource, WellKnownSource};
