use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ResolverConfig;
use crate::types::AgentRecord;

const BUILTIN_DEMO_AGENTS: &str = include_str!("../../data/demo_agents.json");
const BUILTIN_INTERNAL_AGENTS: &str = include_str!("../../data/internal_agents.json");

/// Exact-match lookup table keyed by `agent_uri`.
#[derive(Debug, Default)]
pub struct RecordTable {
    records: RwLock<HashMap<String, AgentRecord>>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = AgentRecord>) -> Self {
        let table = Self::new();
        table.replace(records);
        table
    }

    pub fn get(&self, agent_uri: &str) -> Option<AgentRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(agent_uri).cloned()
    }

    pub fn insert(&self, record: AgentRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.agent_uri.clone(), record);
    }

    pub fn replace(&self, new_records: impl IntoIterator<Item = AgentRecord>) {
        let replacement: HashMap<String, AgentRecord> = new_records
            .into_iter()
            .map(|r| (r.agent_uri.clone(), r))
            .collect();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        *records = replacement;
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    /// All records, ordered by URI.
    pub fn list(&self) -> Vec<AgentRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<AgentRecord> = records.values().cloned().collect();
        list.sort_by(|a, b| a.agent_uri.cmp(&b.agent_uri));
        list
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn parse_records(json: &str) -> Result<Vec<AgentRecord>> {
    serde_json::from_str(json).context("parsing agent record table")
}

pub fn load_records(path: &Path) -> Result<Vec<AgentRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading agent table {}", path.display()))?;
    parse_records(&content).with_context(|| format!("in {}", path.display()))
}

/// The static and runtime lookup tables consulted by the resolution chain.
#[derive(Debug, Clone)]
pub struct AgentTables {
    pub demo: Arc<RecordTable>,
    pub internal: Arc<RecordTable>,
    pub runtime: Arc<RecordTable>,
}

impl AgentTables {
    pub fn empty() -> Self {
        Self {
            demo: Arc::new(RecordTable::new()),
            internal: Arc::new(RecordTable::new()),
            runtime: Arc::new(RecordTable::new()),
        }
    }

    /// Reloads demo and internal tables from `config`, falling back to the built-in data.
    /// The runtime table is left untouched.
    pub fn load(&self, config: &ResolverConfig) -> Result<()> {
        let demo = match &config.demo_agents_path {
            Some(path) => load_records(path)?,
            None => parse_records(BUILTIN_DEMO_AGENTS)?,
        };
        let internal = match &config.internal_agents_path {
            Some(path) => load_records(path)?,
            None => parse_records(BUILTIN_INTERNAL_AGENTS)?,
        };
        self.demo.replace(demo);
        self.internal.replace(internal);
        Ok(())
    }
}
