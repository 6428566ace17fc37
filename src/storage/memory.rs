use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use super::traits::{AgentStore, AgentUpdate, StoreFilter};
use crate::types::AgentRecord;

#[derive(Clone, Default)]
pub struct InMemoryAgentStore {
    agents: Arc<RwLock<HashMap<String, AgentRecord>>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = AgentRecord>) -> Self {
        let agents = records
            .into_iter()
            .map(|r| (r.agent_uri.clone(), r))
            .collect();
        Self {
            agents: Arc::new(RwLock::new(agents)),
        }
    }

    /// Seeds a store from a JSON array of agent records.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading agent records from {}", path.display()))?;
        let records: Vec<AgentRecord> = serde_json::from_str(&content)
            .with_context(|| format!("parsing agent records in {}", path.display()))?;
        Ok(Self::with_records(records))
    }

    pub fn len(&self) -> usize {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn get(&self, agent_uri: &str) -> Result<Option<AgentRecord>> {
        let agents = self
            .agents
            .read()
            .map_err(|_| anyhow!("agent store lock poisoned"))?;
        Ok(agents.get(agent_uri).cloned())
    }

    async fn list(&self, filter: Option<&StoreFilter>) -> Result<Vec<AgentRecord>> {
        let agents = self
            .agents
            .read()
            .map_err(|_| anyhow!("agent store lock poisoned"))?;
        let mut records: Vec<AgentRecord> = agents
            .values()
            .filter(|r| filter.map_or(true, |f| f.matches(r)))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.agent_uri.cmp(&b.agent_uri));
        Ok(records)
    }

    async fn add(&self, agent_uri: &str, update: AgentUpdate) -> Result<AgentRecord> {
        let mut agents = self
            .agents
            .write()
            .map_err(|_| anyhow!("agent store lock poisoned"))?;
        let record = update.merge_over(agent_uri, agents.get(agent_uri))?;
        agents.insert(agent_uri.to_string(), record.clone());
        Ok(record)
    }

    async fn remove(&self, agent_uri: &str) -> Result<bool> {
        let mut agents = self
            .agents
            .write()
            .map_err(|_| anyhow!("agent store lock poisoned"))?;
        Ok(agents.remove(agent_uri).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AgentStatus;
    use std::io::Write;

    fn create_test_update(endpoint: &str) -> AgentUpdate {
        AgentUpdate {
            endpoint: Some(endpoint.to_string()),
            capabilities: Some(["chat".to_string()].into_iter().collect()),
            ..AgentUpdate::default()
        }
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = InMemoryAgentStore::new();
        store
            .add("agent://a.example.com", create_test_update("https://a.example.com"))
            .await
            .unwrap();

        let retrieved = store.get("agent://a.example.com").await.unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().endpoint, "https://a.example.com");
        assert!(store.get("agent://b.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_merges_over_previous() {
        let store = InMemoryAgentStore::new();
        store
            .add("agent://a.example.com", create_test_update("https://a.example.com"))
            .await
            .unwrap();

        let update = AgentUpdate {
            status: Some(AgentStatus::Suspended),
            ..AgentUpdate::default()
        };
        let updated = store.add("agent://a.example.com", update).await.unwrap();

        assert_eq!(updated.status, AgentStatus::Suspended);
        assert_eq!(updated.endpoint, "https://a.example.com");
        assert!(updated.has_capability("chat"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let store = InMemoryAgentStore::with_records([
            AgentRecord::new("agent://a.example.com", "https://a.example.com"),
            AgentRecord::new("agent://b.example.com", "https://b.example.com")
                .with_status(AgentStatus::Inactive),
        ]);

        assert_eq!(store.list(None).await.unwrap().len(), 2);

        let filter = StoreFilter {
            status: Some(AgentStatus::Active),
            ..StoreFilter::default()
        };
        let active = store.list(Some(&filter)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].agent_uri, "agent://a.example.com");
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryAgentStore::with_records([AgentRecord::new(
            "agent://a.example.com",
            "https://a.example.com",
        )]);

        assert!(store.remove("agent://a.example.com").await.unwrap());
        assert!(!store.remove("agent://a.example.com").await.unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_len_survives_poisoned_lock() {
        let store = InMemoryAgentStore::with_records([
            AgentRecord::new("agent://a.example.com", "https://a.example.com"),
            AgentRecord::new("agent://b.example.com", "https://b.example.com"),
        ]);

        let agents = store.agents.clone();
        let _ = std::thread::spawn(move || {
            let _guard = agents.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(store.agents.is_poisoned());
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"agent_uri": "agent://a.example.com", "endpoint": "https://a.example.com"}}]"#
        )
        .unwrap();

        let store = InMemoryAgentStore::from_json_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
    }
}
