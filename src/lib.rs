pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod resolver;
pub mod service;
pub mod storage;
pub mod types;
pub mod uri;
pub mod wellknown;

pub use config::Config;
pub use error::{ResolutionError, ResolutionErrorCode, SourceError};
pub use service::AgentNameService;
pub use types::*;
pub use uri::{parse_agent_uri, validate_agent_uri, ParsedAgentUri};
