pub mod memory;
pub mod traits;

pub use memory::InMemoryAgentStore;
pub use traits::{AgentStore, AgentUpdate, StoreFilter};
